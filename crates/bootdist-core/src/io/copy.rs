use std::path::Path;

use crate::error::{PackagingError, Result};

/// Copy a single file, creating the destination's parent directories.
///
/// Permissions travel with the file, so executables stay executable.
///
/// # Errors
///
/// Returns [`PackagingError::IoAt`] naming whichever path failed.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(PackagingError::io_at(parent))?;
    }
    std::fs::copy(src, dst).map_err(PackagingError::io_at(src))
}

/// Recursively copy a directory tree from `src` to `dst`.
///
/// Uses `fs_extra` for robust recursive copying with overwrite semantics.
///
/// # Errors
///
/// Returns an error if any file or directory cannot be copied.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).map_err(PackagingError::io_at(dst))?;
    fs_extra::dir::copy(
        src,
        dst,
        &fs_extra::dir::CopyOptions::new()
            .content_only(true)
            .overwrite(true),
    )
    .map_err(|e| {
        PackagingError::Io(std::io::Error::other(format!(
            "copy of {} failed: {e}",
            src.display()
        )))
    })?;
    Ok(())
}

/// Copy `src` to `dst` whether it is a file or a directory.
///
/// # Errors
///
/// Returns an error if `src` cannot be inspected or copied.
pub fn copy_path(src: &Path, dst: &Path) -> Result<()> {
    let meta = std::fs::metadata(src).map_err(PackagingError::io_at(src))?;
    if meta.is_dir() {
        copy_dir_all(src, dst)
    } else {
        copy_file(src, dst).map(|_| ())
    }
}
