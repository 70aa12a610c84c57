//! TFS: a fixed-capacity, single-directory, in-memory filesystem with
//! handle-based I/O and hard/symbolic links, safe for concurrent access
//! from multiple threads.
//!
//! The primary surface is [`Filesystem`]: call [`Filesystem::init`] once,
//! then [`Filesystem::open`]/[`Filesystem::read`]/[`Filesystem::write`]/
//! [`Filesystem::close`] handles, plus [`Filesystem::link`],
//! [`Filesystem::symlink`], and [`Filesystem::unlink`] against the single
//! flat directory. [`compat`] wraps the same operations in the integer,
//! `-1`-on-failure calling convention of the original C implementation
//! this crate's data model descends from.

#![deny(missing_docs)]

pub mod block_pool;
pub mod compat;
pub mod directory;
pub mod error;
pub mod filesystem;
pub mod inode;
pub mod open_file_table;
pub mod path;

pub use error::{FsError, Result};
pub use filesystem::{Filesystem, Handle, OpenMode};
pub use tfs_api::Parameters;
