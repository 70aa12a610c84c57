//! The filesystem façade: `init`/`destroy`, the `open`/`close`/`read`/
//! `write` handle API, `link`/`symlink`/`unlink`, and `copy_from_external_fs`
//! (spec.md §4.4). Ties the inode table, block pool, open-file table and
//! directory layer together under the four-level lock hierarchy from
//! spec.md §5.

use std::path::Path;

use bitflags::bitflags;
use parking_lot::Mutex;

use tfs_api::{FType, Parameters, ROOT_DIR_INUM};

use crate::block_pool::BlockPool;
use crate::directory;
use crate::error::{corruption, FsError, Result};
use crate::inode::InodeTable;
use crate::open_file_table::OpenFileTable;
use crate::path;

/// An open-file handle: an index into the open-file table.
pub type Handle = usize;

/// Symlinks resolve through at most this many hops before `open` gives up
/// with `Invalid`, preventing an unbounded chain (or a cycle) from hanging
/// the resolver.
const MAX_SYMLINK_DEPTH: u32 = 40;

/// Chunk size `copy_from_external_fs` reads the host file in, when the
/// caller doesn't need to control it directly.
const DEFAULT_COPY_CHUNK_SIZE: usize = 4096;

bitflags! {
    /// Flags accepted by [`Filesystem::open`] (spec.md §6 "Open modes").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u32 {
        /// Create the file if it does not already exist.
        const CREAT = 0b0001;
        /// Like `CREAT`, but fail with `Exists` if the file is already
        /// present.
        const STRICT_CREATE = 0b0010;
        /// If the file already exists, truncate it to size 0. Has no
        /// effect on a file created by this same call.
        const TRUNC = 0b0100;
        /// If the file already exists, position the cursor at its current
        /// end instead of the start.
        const APPEND = 0b1000;
    }
}

/// The in-memory filesystem (spec.md §2).
pub struct Filesystem {
    params: Parameters,
    tfs_mutex: Mutex<()>,
    inodes: InodeTable,
    blocks: BlockPool,
    open_files: OpenFileTable,
    root_inum: usize,
}

impl Filesystem {
    /// The table-size defaults used when `init` is called with `None`.
    pub fn default_params() -> Parameters {
        Parameters::default()
    }

    /// Build a fresh, empty filesystem and create its root directory.
    pub fn init(params: Option<Parameters>) -> Result<Filesystem> {
        let params = params.unwrap_or_default();
        let fs = Filesystem {
            tfs_mutex: Mutex::new(()),
            inodes: InodeTable::new(params.max_inode_count),
            blocks: BlockPool::new(params.max_block_count, params.block_size),
            open_files: OpenFileTable::new(params.max_open_files_count),
            root_inum: ROOT_DIR_INUM,
            params,
        };
        let root = fs.inodes.create(FType::Directory)?;
        if root != ROOT_DIR_INUM {
            corruption!(
                "root inode allocation returned {} instead of {}",
                root,
                ROOT_DIR_INUM
            );
        }
        log::info!("tfs initialized: {:?}", fs.params);
        Ok(fs)
    }

    /// Tear the filesystem down. Nothing to flush — everything lives in
    /// memory — so this just logs and drops the tables.
    pub fn destroy(self) -> Result<()> {
        log::info!("tfs destroyed");
        Ok(())
    }

    /// The parameters this instance was built with.
    pub fn params(&self) -> Parameters {
        self.params
    }

    /// Open (and optionally create) `path`, returning a handle.
    pub fn open(&self, path: &str, mode: OpenMode) -> Result<Handle> {
        self.open_inner(path, mode, 0)
    }

    fn open_inner(&self, path: &str, mode: OpenMode, depth: u32) -> Result<Handle> {
        if depth > MAX_SYMLINK_DEPTH {
            return Err(FsError::Invalid("symlink resolution too deep"));
        }
        let name = path::validate(path)?;
        let wants_create = mode.contains(OpenMode::CREAT) || mode.contains(OpenMode::STRICT_CREATE);

        let guard = self.tfs_mutex.lock();
        let existing = directory::find_in_dir(&self.inodes, &self.blocks, self.root_inum, name)?;

        match existing {
            Some(inum) => {
                if mode.contains(OpenMode::STRICT_CREATE) {
                    return Err(FsError::Exists);
                }
                drop(guard);

                let symlink_target =
                    self.inodes.with_read(inum, |inode| Ok(inode.symlink_target.clone()))?;
                if let Some(target) = symlink_target {
                    return self.open_inner(&target, mode, depth + 1);
                }

                let offset = if mode.contains(OpenMode::TRUNC) {
                    self.inodes.with_write(inum, |inode| {
                        if let Some(b) = inode.data_block.take() {
                            self.blocks.free(b)?;
                        }
                        inode.size = 0;
                        Ok(())
                    })?;
                    0
                } else if mode.contains(OpenMode::APPEND) {
                    self.inodes.with_read(inum, |inode| Ok(inode.size))?
                } else {
                    0
                };

                self.open_files.add(inum, offset)
            }
            None if wants_create => {
                let inum = self.inodes.create(FType::File)?;
                if let Err(e) =
                    directory::add_dir_entry(&self.inodes, &self.blocks, self.root_inum, name, inum)
                {
                    drop(guard);
                    let _ = self.inodes.delete(inum, &self.blocks);
                    return Err(e);
                }
                drop(guard);

                match self.open_files.add(inum, 0) {
                    Ok(h) => Ok(h),
                    Err(e) => {
                        // Open-file table exhausted after we already
                        // created the inode and linked it in: unwind both
                        // so the failed call leaves no orphan behind.
                        let g = self.tfs_mutex.lock();
                        let _ =
                            directory::clear_dir_entry(&self.inodes, &self.blocks, self.root_inum, name);
                        drop(g);
                        let _ = self.inodes.delete(inum, &self.blocks);
                        Err(e)
                    }
                }
            }
            None => Err(FsError::NotFound),
        }
    }

    /// Close `handle`.
    pub fn close(&self, handle: Handle) -> Result<()> {
        let inum = self.open_files.with_entry(handle, |e| Ok(e.inumber))?;
        self.open_files.remove(handle)?;
        log::debug!("closed handle {} (inode {})", handle, inum);
        Ok(())
    }

    /// Read up to `buf.len()` bytes at `handle`'s current offset, advancing
    /// it by the number of bytes actually read.
    pub fn read(&self, handle: Handle, buf: &mut [u8]) -> Result<usize> {
        // The reference implementation serializes reads against the whole
        // name-space, not just the target inode; preserved here rather
        // than narrowed, since nothing in spec.md asks for the narrower
        // behavior.
        let _global = self.tfs_mutex.lock();
        self.open_files.with_entry_mut(handle, |entry| {
            let inum = entry.inumber;
            let offset = entry.offset;
            let read = self.inodes.with_read(inum, |inode| {
                let available = inode.size.saturating_sub(offset);
                let n = available.min(buf.len());
                if n == 0 {
                    return Ok(0);
                }
                let block_idx = inode.data_block.unwrap_or_else(|| {
                    corruption!("inode {} has size {} but no data block", inum, inode.size)
                });
                self.blocks.with_block(block_idx, |block| {
                    block.read_data(&mut buf[..n], offset)?;
                    Ok(())
                })?;
                Ok(n)
            })?;
            entry.offset += read;
            Ok(read)
        })
    }

    /// Write `data` at `handle`'s current offset, advancing it by the
    /// number of bytes actually written. Writes are clipped to the block
    /// size, same as the reference implementation (spec.md's Non-goals
    /// exclude multi-block files).
    pub fn write(&self, handle: Handle, data: &[u8]) -> Result<usize> {
        self.open_files.with_entry_mut(handle, |entry| {
            let inum = entry.inumber;
            let offset = entry.offset;
            let written = self.inodes.with_write(inum, |inode| {
                let block_size = self.blocks.block_size();
                let room = block_size.saturating_sub(offset);
                let n = data.len().min(room);
                if n == 0 {
                    return Ok(0);
                }
                if inode.data_block.is_none() {
                    inode.data_block = Some(self.blocks.alloc()?);
                }
                let block_idx = inode.data_block.expect("just allocated above");
                self.blocks.with_block_mut(block_idx, |block| {
                    block.write_data(&data[..n], offset)?;
                    Ok(())
                })?;
                inode.size = inode.size.max(offset + n);
                Ok(n)
            })?;
            entry.offset += written;
            Ok(written)
        })
    }

    /// Create a new name for `target` at `link`. Fails with `NotSupported`
    /// if `target` is a symlink — hard links to symlinks aren't part of
    /// this model.
    pub fn link(&self, target: &str, link: &str) -> Result<()> {
        let target_name = path::validate(target)?;
        let link_name = path::validate(link)?;
        let _global = self.tfs_mutex.lock();

        let inum = directory::find_in_dir(&self.inodes, &self.blocks, self.root_inum, target_name)?
            .ok_or(FsError::NotFound)?;
        let is_symlink = self.inodes.with_read(inum, |inode| Ok(inode.symlink_target.is_some()))?;
        if is_symlink {
            return Err(FsError::NotSupported("hard link to a symlink"));
        }

        directory::add_dir_entry(&self.inodes, &self.blocks, self.root_inum, link_name, inum)?;
        self.inodes.with_write(inum, |inode| {
            inode.hard_link_count += 1;
            Ok(())
        })
    }

    /// Create `link` as a symlink resolving to `target`. `target` must
    /// currently resolve to something in the directory.
    pub fn symlink(&self, target: &str, link: &str) -> Result<()> {
        let target_name = path::validate(target)?;
        let link_name = path::validate(link)?;
        let _global = self.tfs_mutex.lock();

        if directory::find_in_dir(&self.inodes, &self.blocks, self.root_inum, target_name)?.is_none() {
            return Err(FsError::NotFound);
        }

        let inum = self.inodes.create(FType::File)?;
        self.inodes.with_write(inum, |inode| {
            inode.symlink_target = Some(target.to_string());
            Ok(())
        })?;

        if let Err(e) =
            directory::add_dir_entry(&self.inodes, &self.blocks, self.root_inum, link_name, inum)
        {
            let _ = self.inodes.delete(inum, &self.blocks);
            return Err(e);
        }
        Ok(())
    }

    /// Remove `path` from the directory, deleting the underlying inode
    /// once its last link is gone. Fails with `Busy` if any handle
    /// currently has the target open, under any name.
    pub fn unlink(&self, path: &str) -> Result<()> {
        let name = path::validate(path)?;
        let _global = self.tfs_mutex.lock();

        let inum = directory::find_in_dir(&self.inodes, &self.blocks, self.root_inum, name)?
            .ok_or(FsError::NotFound)?;
        if self.open_files.contains_inumber(inum) {
            return Err(FsError::Busy);
        }

        directory::clear_dir_entry(&self.inodes, &self.blocks, self.root_inum, name)?;
        let should_delete = self.inodes.with_write(inum, |inode| {
            inode.hard_link_count -= 1;
            Ok(inode.hard_link_count == 0)
        })?;
        if should_delete {
            self.inodes.delete(inum, &self.blocks)?;
        }
        Ok(())
    }

    /// Copy the contents of a host file into `tfs_path`, creating and
    /// truncating it as needed, reading the host file in
    /// `DEFAULT_COPY_CHUNK_SIZE`-byte chunks.
    pub fn copy_from_external_fs(&self, host_path: impl AsRef<Path>, tfs_path: &str) -> Result<()> {
        self.copy_from_external_fs_with_chunk_size(host_path, tfs_path, DEFAULT_COPY_CHUNK_SIZE)
    }

    /// Same as [`Filesystem::copy_from_external_fs`], with an explicit
    /// chunk size — exposed mainly so tests can exercise multi-chunk
    /// copies with small buffers.
    pub fn copy_from_external_fs_with_chunk_size(
        &self,
        host_path: impl AsRef<Path>,
        tfs_path: &str,
        chunk_size: usize,
    ) -> Result<()> {
        use std::io::Read;

        let mut host_file = std::fs::File::open(host_path)?;
        let handle = self.open(tfs_path, OpenMode::CREAT | OpenMode::TRUNC)?;
        let mut buf = vec![0u8; chunk_size.max(1)];
        let result = (|| -> Result<()> {
            loop {
                let n = host_file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                let written = self.write(handle, &buf[..n])?;
                if written != n {
                    log::warn!(
                        "copy_from_external_fs: short write ({} of {} bytes read)",
                        written,
                        n
                    );
                    return Err(FsError::Invalid("short write during external copy"));
                }
            }
            Ok(())
        })();
        let _ = self.close(handle);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn small_fs() -> Filesystem {
        Filesystem::init(Some(Parameters {
            max_inode_count: 8,
            max_block_count: 8,
            max_open_files_count: 4,
            block_size: 64,
        }))
        .unwrap()
    }

    #[test]
    fn init_creates_root_at_expected_inumber() {
        let fs = small_fs();
        assert_eq!(fs.root_inum, ROOT_DIR_INUM);
    }

    #[test]
    fn create_write_read_roundtrip() {
        let fs = small_fs();
        let h = fs.open("/greeting", OpenMode::CREAT).unwrap();
        assert_eq!(fs.write(h, b"hello").unwrap(), 5);
        fs.close(h).unwrap();

        let h2 = fs.open("/greeting", OpenMode::empty()).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(fs.read(h2, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        fs.close(h2).unwrap();
    }

    #[test]
    fn strict_create_rejects_existing_name() {
        let fs = small_fs();
        fs.open("/f", OpenMode::CREAT).unwrap();
        assert!(matches!(
            fs.open("/f", OpenMode::STRICT_CREATE),
            Err(FsError::Exists)
        ));
    }

    #[test]
    fn open_missing_without_creat_is_not_found() {
        let fs = small_fs();
        assert!(matches!(
            fs.open("/missing", OpenMode::empty()),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn trunc_resets_size_and_is_ignored_on_fresh_create() {
        let fs = small_fs();
        let h = fs.open("/f", OpenMode::CREAT).unwrap();
        fs.write(h, b"abcdef").unwrap();
        fs.close(h).unwrap();

        let h2 = fs.open("/f", OpenMode::TRUNC).unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(fs.read(h2, &mut buf).unwrap(), 0);
        fs.close(h2).unwrap();
    }

    #[test]
    fn append_positions_cursor_at_end() {
        let fs = small_fs();
        let h = fs.open("/f", OpenMode::CREAT).unwrap();
        fs.write(h, b"abc").unwrap();
        fs.close(h).unwrap();

        let h2 = fs.open("/f", OpenMode::APPEND).unwrap();
        fs.write(h2, b"def").unwrap();
        fs.close(h2).unwrap();

        let h3 = fs.open("/f", OpenMode::empty()).unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(fs.read(h3, &mut buf).unwrap(), 6);
        assert_eq!(&buf, b"abcdef");
    }

    #[test]
    fn unlink_busy_then_ok_after_close() {
        let fs = small_fs();
        let h = fs.open("/t", OpenMode::CREAT).unwrap();
        assert!(matches!(fs.unlink("/t"), Err(FsError::Busy)));
        fs.close(h).unwrap();
        fs.unlink("/t").unwrap();
        assert!(matches!(
            fs.open("/t", OpenMode::empty()),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn hardlink_shares_content_and_survives_one_unlink() {
        let fs = small_fs();
        let h = fs.open("/a", OpenMode::CREAT).unwrap();
        fs.write(h, b"shared").unwrap();
        fs.close(h).unwrap();

        fs.link("/a", "/b").unwrap();
        fs.unlink("/a").unwrap();

        let h2 = fs.open("/b", OpenMode::empty()).unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(fs.read(h2, &mut buf).unwrap(), 6);
        assert_eq!(&buf, b"shared");
    }

    #[test]
    fn link_to_symlink_is_not_supported() {
        let fs = small_fs();
        fs.open("/t", OpenMode::CREAT).unwrap();
        fs.symlink("/t", "/s").unwrap();
        assert!(matches!(
            fs.link("/s", "/l"),
            Err(FsError::NotSupported(_))
        ));
    }

    #[test]
    fn symlink_resolves_through_to_target_contents() {
        let fs = small_fs();
        let h = fs.open("/t", OpenMode::CREAT).unwrap();
        fs.write(h, b"via-link").unwrap();
        fs.close(h).unwrap();

        fs.symlink("/t", "/s").unwrap();
        let h2 = fs.open("/s", OpenMode::empty()).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(fs.read(h2, &mut buf).unwrap(), 8);
        assert_eq!(&buf, b"via-link");
    }

    #[test]
    fn symlink_to_missing_target_is_not_found() {
        let fs = small_fs();
        assert!(matches!(
            fs.symlink("/ghost", "/s"),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn write_is_clipped_to_one_block() {
        let fs = small_fs();
        let h = fs.open("/f", OpenMode::CREAT).unwrap();
        let data = vec![b'x'; 100];
        let n = fs.write(h, &data).unwrap();
        assert_eq!(n, 64);
    }

    #[test]
    fn copy_from_external_fs_round_trips_in_small_chunks() {
        let fs = small_fs();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"round trip contents").unwrap();
        tmp.flush().unwrap();

        fs.copy_from_external_fs_with_chunk_size(tmp.path(), "/copied", 4)
            .unwrap();

        let h = fs.open("/copied", OpenMode::empty()).unwrap();
        let mut buf = [0u8; 19];
        assert_eq!(fs.read(h, &mut buf).unwrap(), 19);
        assert_eq!(&buf, b"round trip contents");
    }

    #[test]
    fn open_file_table_exhaustion_does_not_orphan_new_inode() {
        let fs = small_fs();
        let mut handles = Vec::new();
        for i in 0..fs.params.max_open_files_count {
            handles.push(fs.open(&format!("/f{}", i), OpenMode::CREAT).unwrap());
        }
        assert!(matches!(
            fs.open("/overflow", OpenMode::CREAT),
            Err(FsError::NoSpace(_))
        ));
        // the failed create must not have left a directory entry or inode
        // behind: creating it again under different pressure should work.
        for h in handles {
            fs.close(h).unwrap();
        }
        fs.open("/overflow", OpenMode::STRICT_CREATE).unwrap();
    }
}
