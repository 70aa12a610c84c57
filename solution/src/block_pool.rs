//! The data-block pool: a fixed-capacity array of fixed-size [`Buffer`]s
//! with the same first-fit bitmap allocation discipline as the inode table
//! and open-file table (spec.md §4.1).

use parking_lot::{Mutex, RwLock};

use tfs_api::{Bitmap, Buffer};

use crate::error::{FsError, Result};

/// The bounded data-block pool.
pub struct BlockPool {
    bitmap: Mutex<Bitmap>,
    block_size: usize,
    blocks: Vec<RwLock<Buffer>>,
}

impl BlockPool {
    /// Create a pool of `capacity` blocks, each `block_size` bytes, all
    /// zeroed and free.
    pub fn new(capacity: usize, block_size: usize) -> BlockPool {
        BlockPool {
            bitmap: Mutex::new(Bitmap::new(capacity)),
            block_size,
            blocks: (0..capacity)
                .map(|_| RwLock::new(Buffer::new_zero(block_size)))
                .collect(),
        }
    }

    /// Size, in bytes, of every block in this pool.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks in this pool.
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Allocate the first free block, zeroed.
    pub fn alloc(&self) -> Result<usize> {
        let i = {
            let mut bitmap = self.bitmap.lock();
            bitmap
                .alloc_first_free()
                .map_err(|_| FsError::NoSpace("data block pool exhausted"))?
        };
        self.blocks[i].write().zero();
        Ok(i)
    }

    /// Zero block `i` and return it to the free pool.
    pub fn free(&self, i: usize) -> Result<()> {
        self.blocks
            .get(i)
            .ok_or(FsError::Invalid("block index out of range"))?
            .write()
            .zero();
        self.bitmap
            .lock()
            .free(i)
            .map_err(|_| FsError::Invalid("block already free"))?;
        Ok(())
    }

    /// Run `f` with shared access to block `i`'s contents.
    pub fn with_block<R>(&self, i: usize, f: impl FnOnce(&Buffer) -> Result<R>) -> Result<R> {
        let guard = self
            .blocks
            .get(i)
            .ok_or(FsError::Invalid("block index out of range"))?
            .read();
        f(&guard)
    }

    /// Run `f` with exclusive access to block `i`'s contents.
    pub fn with_block_mut<R>(
        &self,
        i: usize,
        f: impl FnOnce(&mut Buffer) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self
            .blocks
            .get(i)
            .ok_or(FsError::Invalid("block index out of range"))?
            .write();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_gives_zeroed_blocks() {
        let pool = BlockPool::new(2, 8);
        let b = pool.alloc().unwrap();
        pool.with_block(b, |buf| {
            assert_eq!(buf.contents_as_ref(), &[0u8; 8]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn free_zeroes_and_recycles() {
        let pool = BlockPool::new(1, 8);
        let b = pool.alloc().unwrap();
        pool.with_block_mut(b, |buf| {
            buf.write_data(&[9; 4], 0)?;
            Ok(())
        })
        .unwrap();
        pool.free(b).unwrap();
        let b2 = pool.alloc().unwrap();
        assert_eq!(b, b2);
        pool.with_block(b2, |buf| {
            assert_eq!(buf.contents_as_ref(), &[0u8; 8]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn exhaustion_errors() {
        let pool = BlockPool::new(1, 8);
        pool.alloc().unwrap();
        assert!(matches!(pool.alloc(), Err(FsError::NoSpace(_))));
    }

    #[test]
    fn out_of_range_access_is_invalid() {
        let pool = BlockPool::new(1, 8);
        assert!(matches!(
            pool.with_block(5, |_| Ok(())),
            Err(FsError::Invalid(_))
        ));
    }
}
