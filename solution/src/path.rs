//! Path validation (spec.md §4.3). The filesystem has a single flat
//! directory, so a "path" is always `/` followed by a file name — there is
//! no multi-component traversal to resolve.

use tfs_api::MAX_FILE_NAME;

use crate::error::{FsError, Result};

/// Validate `path` and return the bare name that follows the leading `/`.
///
/// Rejects anything whose total length (the leading `/` included) is not
/// strictly less than `MAX_FILE_NAME`: empty paths, paths missing the
/// leading slash, and paths one byte too long to leave room for the
/// implicit NUL terminator spec.md §4.3 requires.
pub fn validate(path: &str) -> Result<&str> {
    if !path.starts_with('/') {
        return Err(FsError::Invalid("path must start with '/'"));
    }
    let name = &path[1..];
    if name.is_empty() || name.len() > MAX_FILE_NAME - 2 {
        return Err(FsError::Invalid(
            "path total length must be < MAX_FILE_NAME",
        ));
    }
    if name.contains('/') {
        return Err(FsError::Invalid("path may only name a top-level entry"));
    }
    Ok(name)
}
