//! Shared primitives for the TFS in-memory filesystem.
//!
//! This crate provides the small, reusable building blocks that the `tfs`
//! crate assembles into the actual filesystem: a fixed-size byte [`Buffer`]
//! with encode/decode helpers, the bit-packed [`Bitmap`] used by every
//! allocator table, the [`Parameters`] configuration record, and the
//! crate-wide [`ApiError`] type.

#![deny(missing_docs)]

pub mod bitmap;
pub mod error;
pub mod types;

pub use bitmap::Bitmap;
pub use error::{ApiError, Result};
pub use types::{
    Buffer, DirEntry, FType, Parameters, DIRENTRY_SIZE, EMPTY_DIRENTRY_INUM, MAX_FILE_NAME,
    ROOT_DIR_INUM,
};
