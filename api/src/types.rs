//! Types shared between the allocator tables and the filesystem API:
//! the [`Buffer`] abstraction backing every data block, the [`FType`]
//! inode type tag, and the [`Parameters`] configuration record.

use lazy_static::lazy_static;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::prelude::*;
use std::io::{Cursor, SeekFrom};

use crate::error::{ApiError, Result};

/// Name-length upper bound enforced by path validation (spec.md §4.3).
/// A path's total length (including the leading `/`) must be strictly
/// less than this value.
pub const MAX_FILE_NAME: usize = 40;

/// The inumber returned by the first `inode_create` call after `init` —
/// always the root directory's inode.
pub const ROOT_DIR_INUM: usize = 0;

/// Fixed-size byte buffer representing the contents of one data block.
///
/// Like a disk block in a persistent filesystem, a `Buffer` does not know
/// or care what it holds: raw file bytes, or an encoded directory-entry
/// array. Callers interpret the bytes; `Buffer` only enforces bounds and
/// provides (de)serialization helpers for structured access.
#[derive(Debug, PartialEq, Eq)]
pub struct Buffer {
    contents: Box<[u8]>,
}

impl Buffer {
    /// Create an all-zero buffer of `len` bytes.
    pub fn new_zero(len: usize) -> Buffer {
        Buffer {
            contents: vec![0u8; len].into_boxed_slice(),
        }
    }

    /// Size of this buffer, in bytes.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether this buffer holds zero bytes.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Borrow this buffer's contents.
    pub fn contents_as_ref(&self) -> &[u8] {
        &self.contents
    }

    /// Zero out the entire buffer in place.
    pub fn zero(&mut self) {
        self.contents.iter_mut().for_each(|b| *b = 0);
    }

    /// Read `data.len()` bytes starting at `offset` into `data`.
    pub fn read_data(&self, data: &mut [u8], offset: usize) -> Result<()> {
        if offset + data.len() > self.len() {
            return Err(ApiError::BufferInput(
                "trying to read beyond the bounds of the buffer",
            ));
        }
        let mut c = Cursor::new(&self.contents);
        c.seek(SeekFrom::Start(offset as u64)).unwrap();
        c.read_exact(data)
            .map_err(|_| ApiError::BufferInput("short read from buffer"))
    }

    /// Write `data` into this buffer starting at `offset`.
    pub fn write_data(&mut self, data: &[u8], offset: usize) -> Result<()> {
        if offset + data.len() > self.len() {
            return Err(ApiError::BufferInput(
                "trying to write beyond the bounds of the buffer",
            ));
        }
        let mut c = Cursor::new(&mut self.contents[..]);
        c.seek(SeekFrom::Start(offset as u64)).unwrap();
        c.write_all(data)
            .map_err(|_| ApiError::BufferInput("short write into buffer"))
    }

    /// Deserialize a `DeserializeOwned` value starting at byte `offset`.
    pub fn deserialize_from<S: DeserializeOwned>(&self, offset: usize) -> Result<S> {
        let mut c = Cursor::new(&self.contents);
        c.seek(SeekFrom::Start(offset as u64)).unwrap();
        Ok(bincode::deserialize_from(c)?)
    }

    /// Serialize a `Serialize` value into this buffer starting at byte
    /// `offset`. Goes through [`Buffer::write_data`] so that out-of-bounds
    /// writes are rejected rather than silently growing the buffer.
    pub fn serialize_into<S: Serialize>(&mut self, value: &S, offset: usize) -> Result<()> {
        let encoded = bincode::serialize(value)?;
        self.write_data(&encoded, offset)
    }
}

/// Inode type tag. Free inode slots are represented by `Option::None` at
/// the allocator-table level rather than by a third variant here, so the
/// type only ever names the two kinds spec.md §3 describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FType {
    /// The single root directory.
    Directory,
    /// A regular file, or a symlink (distinguished by `symlink_target`).
    File,
}

/// Immutable configuration fixing table sizes and block size, set once at
/// `Filesystem::init` (spec.md §3 "Parameters").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    /// Capacity of the inode table.
    pub max_inode_count: usize,
    /// Capacity of the data-block pool.
    pub max_block_count: usize,
    /// Capacity of the open-file table.
    pub max_open_files_count: usize,
    /// Size, in bytes, of every data block.
    pub block_size: usize,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            max_inode_count: 64,
            max_block_count: 1024,
            max_open_files_count: 16,
            block_size: 1024,
        }
    }
}

/// Sentinel inumber marking a directory entry slot as empty.
pub const EMPTY_DIRENTRY_INUM: i64 = -1;

/// One (name, inumber) pair in the root directory's entry array.
///
/// `name` is always padded out to [`MAX_FILE_NAME`] bytes before encoding,
/// so every entry occupies exactly [`DIRENTRY_SIZE`] bytes in the backing
/// block regardless of how short the name is — the array-of-fixed-slots
/// layout spec.md §4.2 describes. An entry with `inumber ==
/// EMPTY_DIRENTRY_INUM` is free.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: Vec<u8>,
    /// Inode number this entry points to, or [`EMPTY_DIRENTRY_INUM`].
    pub inumber: i64,
}

impl DirEntry {
    /// An empty slot.
    pub fn empty() -> DirEntry {
        DirEntry {
            name: vec![0u8; MAX_FILE_NAME],
            inumber: EMPTY_DIRENTRY_INUM,
        }
    }

    /// Build an occupied entry. Returns `None` if `name` (as bytes) does
    /// not fit in `MAX_FILE_NAME - 1` bytes, leaving room for the implicit
    /// NUL terminator spec.md §3 describes.
    pub fn new(name: &str, inumber: usize) -> Option<DirEntry> {
        if name.is_empty() || name.len() > MAX_FILE_NAME - 1 {
            return None;
        }
        let mut bytes = vec![0u8; MAX_FILE_NAME];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Some(DirEntry {
            name: bytes,
            inumber: inumber as i64,
        })
    }

    /// Whether this slot is free.
    pub fn is_empty(&self) -> bool {
        self.inumber == EMPTY_DIRENTRY_INUM
    }

    /// This entry's name, read up to the first NUL byte.
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Raw, NUL-padded name bytes, compared up to the first NUL as
    /// spec.md §4.2 specifies ("Names are compared as byte sequences up
    /// to the first NUL").
    pub fn name_matches(&self, other: &str) -> bool {
        self.name_str() == other
    }
}

lazy_static! {
    /// Byte size of one encoded [`DirEntry`] slot. Computed once at
    /// runtime (rather than hardcoded) because it depends on the bincode
    /// wire format, same rationale as the teacher's `DINODE_SIZE`.
    pub static ref DIRENTRY_SIZE: usize =
        bincode::serialize(&DirEntry::empty()).unwrap().len();
}
