//! Atomic file writes.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a uniquely named temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! `rename` replaces the destination atomically on POSIX, and std maps it to
//! `MoveFileExW(MOVEFILE_REPLACE_EXISTING)` on Windows. Source and destination
//! must be on the same filesystem, which holds because the temporary file is
//! created next to the target. On crash a temporary file
//! (`.{filename}.{suffix}.tmp`) may remain; readers ignore dot files.

use crate::error::{DocLockError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Atomically write bytes to a file, creating parent directories as needed.
///
/// # Returns
///
/// * `Ok(())` - On successful atomic write
/// * `Err(DocLockError::StoreError)` - On write or rename failure
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            DocLockError::StoreError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    replace(&temp_path, path)
}

/// Generate a temporary file path in the same directory as the target.
///
/// The random suffix keeps concurrent writers of the same target from
/// clobbering each other's temporary file.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DocLockError::StoreError("invalid file path".to_string()))?;

    let suffix = Uuid::new_v4().simple().to_string();
    Ok(parent.join(format!(".{}.{}.tmp", filename, &suffix[..12])))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        DocLockError::StoreError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        DocLockError::StoreError(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        DocLockError::StoreError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

fn replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        DocLockError::StoreError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Persist the directory entry as well
    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
