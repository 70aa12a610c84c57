//! The directory layer (spec.md §4.2): a flat array of [`DirEntry`] slots
//! living in the root directory inode's single data block, allocated
//! lazily on the first insert. Free functions, not a type — every
//! operation needs the inode table and block pool together, so it reads
//! more naturally as a small set of functions over those two tables than
//! as a struct wrapping both.

use tfs_api::{DirEntry, FType, DIRENTRY_SIZE};

use crate::block_pool::BlockPool;
use crate::error::{FsError, Result};
use crate::inode::InodeTable;

fn entries_per_block(block_size: usize) -> usize {
    block_size / *DIRENTRY_SIZE
}

/// Insert `(name, inumber)` into `dir_inum`'s entry array, allocating a
/// data block on the first call. Errors with `Exists` if `name` is already
/// present, `NoSpace` if the directory's single block is full.
pub fn add_dir_entry(
    inodes: &InodeTable,
    blocks: &BlockPool,
    dir_inum: usize,
    name: &str,
    inumber: usize,
) -> Result<()> {
    let entry = DirEntry::new(name, inumber).ok_or(FsError::Invalid("bad entry name"))?;
    inodes.with_write(dir_inum, |dir| {
        if dir.ftype != FType::Directory {
            return Err(FsError::Invalid("not a directory"));
        }
        let block_idx = match dir.data_block {
            Some(b) => b,
            None => {
                let b = blocks.alloc()?;
                dir.data_block = Some(b);
                b
            }
        };
        blocks.with_block_mut(block_idx, |buf| {
            let slots = entries_per_block(buf.len());
            let mut free_slot = None;
            for slot in 0..slots {
                let off = slot * *DIRENTRY_SIZE;
                let existing: DirEntry = buf.deserialize_from(off)?;
                if existing.is_empty() {
                    if free_slot.is_none() {
                        free_slot = Some(off);
                    }
                } else if existing.name_matches(name) {
                    return Err(FsError::Exists);
                }
            }
            let off = free_slot.ok_or(FsError::NoSpace("directory is full"))?;
            buf.serialize_into(&entry, off)?;
            Ok(())
        })?;
        dir.size = blocks.block_size();
        Ok(())
    })
}

/// Look up `name` in `dir_inum`'s entry array. Returns `Ok(None)` (not an
/// error) if the directory has no entries yet or `name` is absent.
pub fn find_in_dir(
    inodes: &InodeTable,
    blocks: &BlockPool,
    dir_inum: usize,
    name: &str,
) -> Result<Option<usize>> {
    inodes.with_read(dir_inum, |dir| {
        if dir.ftype != FType::Directory {
            return Err(FsError::Invalid("not a directory"));
        }
        let block_idx = match dir.data_block {
            Some(b) => b,
            None => return Ok(None),
        };
        blocks.with_block(block_idx, |buf| {
            let slots = entries_per_block(buf.len());
            for slot in 0..slots {
                let off = slot * *DIRENTRY_SIZE;
                let entry: DirEntry = buf.deserialize_from(off)?;
                if !entry.is_empty() && entry.name_matches(name) {
                    return Ok(Some(entry.inumber as usize));
                }
            }
            Ok(None)
        })
    })
}

/// Clear the entry named `name`, freeing its slot for reuse. Errors with
/// `NotFound` if no such entry exists.
pub fn clear_dir_entry(
    inodes: &InodeTable,
    blocks: &BlockPool,
    dir_inum: usize,
    name: &str,
) -> Result<()> {
    inodes.with_write(dir_inum, |dir| {
        let block_idx = dir.data_block.ok_or(FsError::NotFound)?;
        blocks.with_block_mut(block_idx, |buf| {
            let slots = entries_per_block(buf.len());
            for slot in 0..slots {
                let off = slot * *DIRENTRY_SIZE;
                let entry: DirEntry = buf.deserialize_from(off)?;
                if !entry.is_empty() && entry.name_matches(name) {
                    buf.serialize_into(&DirEntry::empty(), off)?;
                    return Ok(());
                }
            }
            Err(FsError::NotFound)
        })
    })
}
