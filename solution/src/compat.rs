//! Legacy, integer-handle compatibility surface mirroring the original
//! `tfs_*` C ABI (spec.md §6): every operation returns a plain integer,
//! with `-1` meaning failure. This is not the primary API — see
//! [`crate::Filesystem`] — just a thin shim over it for callers that still
//! speak the old calling convention.

use std::convert::TryFrom;
use std::path::Path;

use crate::error::{FsError, Result};
use crate::filesystem::{Filesystem, OpenMode};

/// `tfs_open` — returns the new handle, or `-1` on failure.
pub fn tfs_open(fs: &Filesystem, path: &str, mode: OpenMode) -> i64 {
    fs.open(path, mode).map(|h| h as i64).unwrap_or(-1)
}

/// `tfs_close` — returns `0`, or `-1` on failure.
pub fn tfs_close(fs: &Filesystem, handle: i64) -> i64 {
    to_legacy_status(handle_of(handle).and_then(|h| fs.close(h)))
}

/// `tfs_write` — returns the byte count written, or `-1` on failure.
pub fn tfs_write(fs: &Filesystem, handle: i64, data: &[u8]) -> i64 {
    to_legacy_count(handle_of(handle).and_then(|h| fs.write(h, data)))
}

/// `tfs_read` — returns the byte count read, or `-1` on failure.
pub fn tfs_read(fs: &Filesystem, handle: i64, buf: &mut [u8]) -> i64 {
    to_legacy_count(handle_of(handle).and_then(|h| fs.read(h, buf)))
}

/// `tfs_link` — returns `0`, or `-1` on failure.
pub fn tfs_link(fs: &Filesystem, target: &str, link: &str) -> i64 {
    to_legacy_status(fs.link(target, link))
}

/// `tfs_sym_link` — returns `0`, or `-1` on failure.
pub fn tfs_sym_link(fs: &Filesystem, target: &str, link: &str) -> i64 {
    to_legacy_status(fs.symlink(target, link))
}

/// `tfs_unlink` — returns `0`, or `-1` on failure.
pub fn tfs_unlink(fs: &Filesystem, path: &str) -> i64 {
    to_legacy_status(fs.unlink(path))
}

/// `tfs_copy_to_external_fs` counterpart: copies a host file in. Returns
/// `0`, or `-1` on failure.
pub fn tfs_copy_from_external_fs(fs: &Filesystem, host_path: &Path, tfs_path: &str) -> i64 {
    to_legacy_status(fs.copy_from_external_fs(host_path, tfs_path))
}

fn handle_of(handle: i64) -> Result<usize> {
    usize::try_from(handle).map_err(|_| FsError::Invalid("negative handle"))
}

fn to_legacy_status<T>(result: Result<T>) -> i64 {
    match result {
        Ok(_) => 0,
        Err(_) => -1,
    }
}

fn to_legacy_count(result: Result<usize>) -> i64 {
    match result {
        Ok(n) => n as i64,
        Err(_) => -1,
    }
}
