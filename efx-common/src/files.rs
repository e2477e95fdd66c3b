//! File system helpers shared by the assembler, previews and site generation

use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::Result;

/// Copy a directory tree (or a single file) to `dest`
///
/// `dest` and any missing parents are created. Symlinks are not followed.
pub fn copy_directory(src: &Path, dest: &Path) -> Result<u64> {
    if src.is_file() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        return Ok(fs::copy(src, dest)?);
    }

    let mut copied = 0u64;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, format!("walking {}: {}", src.display(), e))
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| crate::Error::Internal(e.to_string()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            copied += fs::copy(entry.path(), &target)?;
        }
    }

    tracing::debug!(
        src = %src.display(),
        dest = %dest.display(),
        bytes = copied,
        "Copied directory"
    );
    Ok(copied)
}

/// Remove a directory tree if it exists
pub fn clean_up(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}
