//! The open-file table: a fixed-capacity array of `(inumber, offset)`
//! entries, each behind its own mutex (spec.md §4.1, lock (2) in §5). A
//! table index doubles as the handle returned to callers of `open`.

use parking_lot::Mutex;

use tfs_api::Bitmap;

use crate::error::{FsError, Result};

/// One open-file entry: which inode it refers to, and the current byte
/// offset for the next read/write.
#[derive(Debug, Clone, Copy)]
pub struct OpenFileEntry {
    /// The inode this handle refers to.
    pub inumber: usize,
    /// Current read/write cursor.
    pub offset: usize,
}

/// The bounded open-file table.
pub struct OpenFileTable {
    bitmap: Mutex<Bitmap>,
    entries: Vec<Mutex<Option<OpenFileEntry>>>,
}

impl OpenFileTable {
    /// Create a table with room for `capacity` concurrently open handles.
    pub fn new(capacity: usize) -> OpenFileTable {
        OpenFileTable {
            bitmap: Mutex::new(Bitmap::new(capacity)),
            entries: (0..capacity).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Total number of handle slots.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Allocate the first free handle, pointing it at `inumber` with the
    /// given initial offset.
    pub fn add(&self, inumber: usize, offset: usize) -> Result<usize> {
        let i = {
            let mut bitmap = self.bitmap.lock();
            bitmap
                .alloc_first_free()
                .map_err(|_| FsError::NoSpace("open-file table exhausted"))?
        };
        *self.entries[i].lock() = Some(OpenFileEntry { inumber, offset });
        Ok(i)
    }

    /// Release `handle` back to the free pool.
    pub fn remove(&self, handle: usize) -> Result<()> {
        {
            let mut entry = self
                .entries
                .get(handle)
                .ok_or(FsError::Invalid("bad handle"))?
                .lock();
            if entry.is_none() {
                return Err(FsError::Invalid("bad handle"));
            }
            *entry = None;
        }
        self.bitmap
            .lock()
            .free(handle)
            .map_err(|_| FsError::Invalid("handle already free"))?;
        Ok(())
    }

    /// Run `f` with shared access to the entry at `handle`.
    pub fn with_entry<R>(
        &self,
        handle: usize,
        f: impl FnOnce(&OpenFileEntry) -> Result<R>,
    ) -> Result<R> {
        let entry = self
            .entries
            .get(handle)
            .ok_or(FsError::Invalid("bad handle"))?
            .lock();
        let e = entry.as_ref().ok_or(FsError::Invalid("bad handle"))?;
        f(e)
    }

    /// Run `f` with exclusive access to the entry at `handle`.
    pub fn with_entry_mut<R>(
        &self,
        handle: usize,
        f: impl FnOnce(&mut OpenFileEntry) -> Result<R>,
    ) -> Result<R> {
        let mut entry = self
            .entries
            .get(handle)
            .ok_or(FsError::Invalid("bad handle"))?
            .lock();
        let e = entry.as_mut().ok_or(FsError::Invalid("bad handle"))?;
        f(e)
    }

    /// Whether any handle currently references `inumber` — the check
    /// `unlink` uses to decide `Busy`.
    pub fn contains_inumber(&self, inumber: usize) -> bool {
        self.entries
            .iter()
            .any(|slot| matches!(*slot.lock(), Some(e) if e.inumber == inumber))
    }
}
