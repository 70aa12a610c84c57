//! Error type shared by the allocator/buffer primitives in this crate.
//!
//! Mirrors the layering used throughout this lineage of filesystem
//! projects: a small `thiserror` enum at the bottom, wrapped with
//! `#[from]` by each layer built on top of it (see `tfs::error::FsError`).

use thiserror::Error;

/// Errors that can occur while manipulating a [`crate::Buffer`] or a
/// [`crate::Bitmap`] directly, independent of any filesystem semantics.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A read or write fell outside the bounds of the buffer it targeted.
    #[error("buffer input error: {0}")]
    BufferInput(&'static str),

    /// (De)serializing a value into/out of a buffer failed.
    #[error("encoding error in buffer contents")]
    Encoding(#[from] bincode::Error),

    /// A bitmap operation (allocate, free) referenced an out-of-range index.
    #[error("bitmap input error: {0}")]
    BitmapInput(&'static str),
}

/// Shorthand for a `Result` using [`ApiError`].
pub type Result<T> = std::result::Result<T, ApiError>;
