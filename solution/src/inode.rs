//! The inode layer: a fixed-capacity table of inodes, each behind its own
//! readers/writer lock, plus the allocation discipline from spec.md §4.1.
//!
//! An inode's `type`, `hard_link_count`, and `symlink_target` are meant to
//! be written only while the caller holds the filesystem-wide name-space
//! mutex (spec.md §5's lock (1)); the `size`, `data_block`, and block
//! contents are meant to be guarded by the inode's own lock (lock (3)).
//! This table uses one `RwLock` per inode for both purposes — taking the
//! inode's write lock is always at least as strong a guarantee as either
//! individual rule asks for, and every caller in `filesystem.rs` that
//! mutates link-count/type/symlink fields already holds the name-space
//! mutex first, so the two guarantees layer rather than conflict.

use parking_lot::RwLock;

use tfs_api::{Bitmap, FType};

use crate::block_pool::BlockPool;
use crate::error::{FsError, Result};

/// An in-memory inode (spec.md §3).
#[derive(Debug, Clone)]
pub struct Inode {
    /// Directory or regular file (symlinks are files with a target set).
    pub ftype: FType,
    /// Size in bytes; always in `[0, block_size]`.
    pub size: usize,
    /// Index into the data-block pool, if one is owned.
    pub data_block: Option<usize>,
    /// Number of directory entries referencing this inode.
    pub hard_link_count: u32,
    /// Resolution target, for symlinks.
    pub symlink_target: Option<String>,
}

impl Inode {
    fn new(ftype: FType) -> Inode {
        Inode {
            ftype,
            size: 0,
            data_block: None,
            hard_link_count: 1,
            symlink_target: None,
        }
    }
}

/// The bounded inode table.
pub struct InodeTable {
    bitmap: parking_lot::Mutex<Bitmap>,
    slots: Vec<RwLock<Option<Inode>>>,
}

impl InodeTable {
    /// Create a table with room for `capacity` inodes, all initially free.
    pub fn new(capacity: usize) -> InodeTable {
        InodeTable {
            bitmap: parking_lot::Mutex::new(Bitmap::new(capacity)),
            slots: (0..capacity).map(|_| RwLock::new(None)).collect(),
        }
    }

    /// Total number of inode slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Allocate the first free slot, initializing a fresh inode of type
    /// `ftype` (size 0, `hard_link_count = 1`, no symlink target).
    pub fn create(&self, ftype: FType) -> Result<usize> {
        let i = {
            let mut bitmap = self.bitmap.lock();
            bitmap
                .alloc_first_free()
                .map_err(|_| FsError::NoSpace("inode table exhausted"))?
        };
        *self.slots[i].write() = Some(Inode::new(ftype));
        Ok(i)
    }

    /// Free any data block owned by inode `i`, then release its slot.
    pub fn delete(&self, i: usize, blocks: &BlockPool) -> Result<()> {
        let owned_block = {
            let mut slot = self
                .slots
                .get(i)
                .ok_or(FsError::Invalid("inumber out of range"))?
                .write();
            let inode = slot.as_ref().ok_or(FsError::Invalid("inode already free"))?;
            let owned_block = inode.data_block;
            *slot = None;
            owned_block
        };
        if let Some(b) = owned_block {
            blocks.free(b)?;
        }
        self.bitmap
            .lock()
            .free(i)
            .map_err(|_| FsError::Invalid("inode slot already free"))?;
        log::debug!("inode {} deleted", i);
        Ok(())
    }

    /// Run `f` with shared access to inode `i`. Errors with `NotFound` if
    /// the slot is currently free.
    pub fn with_read<R>(&self, i: usize, f: impl FnOnce(&Inode) -> Result<R>) -> Result<R> {
        let slot = self
            .slots
            .get(i)
            .ok_or(FsError::Invalid("inumber out of range"))?
            .read();
        let inode = slot.as_ref().ok_or(FsError::NotFound)?;
        f(inode)
    }

    /// Run `f` with exclusive access to inode `i`. Errors with `NotFound`
    /// if the slot is currently free.
    pub fn with_write<R>(&self, i: usize, f: impl FnOnce(&mut Inode) -> Result<R>) -> Result<R> {
        let mut slot = self
            .slots
            .get(i)
            .ok_or(FsError::Invalid("inumber out of range"))?
            .write();
        let inode = slot.as_mut().ok_or(FsError::NotFound)?;
        f(inode)
    }
}
