//! Error type for the TFS filesystem layer.
//!
//! Wraps [`tfs_api::ApiError`] the same way `InodeLayerError` wraps
//! `BlockLayerError` in the course lineage this crate descends from: each
//! layer adds the error kinds spec.md §7 requires it to be able to raise,
//! and lets `?` promote lower-layer failures automatically.

use thiserror::Error;

/// Error kinds spec.md §7 requires the core to distinguish.
#[derive(Error, Debug)]
pub enum FsError {
    /// Bad path, bad handle, or bad mode combination.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),

    /// A lookup that was required to succeed did not find anything.
    #[error("not found")]
    NotFound,

    /// `STRICT_CREATE` was used on a name that already exists.
    #[error("already exists")]
    Exists,

    /// An allocator table (inodes, blocks, or open files) is exhausted.
    #[error("no space left: {0}")]
    NoSpace(&'static str),

    /// `unlink` targeted a name that is referenced by an open-file entry.
    #[error("resource busy")]
    Busy,

    /// A hard link to a symlink was attempted.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// Host I/O failure while copying from an external filesystem.
    #[error("external I/O error")]
    Io(#[from] std::io::Error),

    /// A lower-layer buffer/bitmap/encoding failure.
    #[error("internal storage error")]
    Storage(#[from] tfs_api::ApiError),

    /// Catch-all for errors raised by a collaborator outside this crate's
    /// own error kinds (e.g. a future external-copy source other than a
    /// plain host file). Mirrors the teacher's own `Other(#[from]
    /// anyhow::Error)` escape hatch.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Shorthand for a `Result` using [`FsError`].
pub type Result<T> = std::result::Result<T, FsError>;

/// Abort the process on a detected invariant violation.
///
/// Matches the original implementation's `ALWAYS_ASSERT` and spec.md §7's
/// "`Corruption` is fatal and unrecoverable" — this is not a `Result`
/// variant a caller could catch and continue past.
macro_rules! corruption {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
        panic!($($arg)*)
    }};
}

pub(crate) use corruption;
