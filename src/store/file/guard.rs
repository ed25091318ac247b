//! Exclusive-create guard files serializing updates of one lock document.
//!
//! A guard is created with `create_new` semantics, so only one process holds
//! it at a time, and removed when dropped. It is held only for the duration
//! of one read-modify-write, so a guard older than [`STALE_GUARD_AGE`] can
//! only belong to a process that died or stalled mid-update and is broken.
//!
//! Every guard carries a random token. A guard file is never removed by path
//! alone: it is first renamed to a unique tombstone, and the tombstone is
//! deleted only if it is the guard the caller meant to remove. Anything else
//! is linked back into place.

use crate::error::{DocLockError, Result};
use crate::owner::owner_label;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::warn;
use uuid::Uuid;

/// Age after which a guard is considered abandoned.
pub(super) const STALE_GUARD_AGE: Duration = Duration::from_secs(30);

/// How long to keep retrying before reporting a store failure.
const GUARD_TIMEOUT: Duration = Duration::from_secs(10);

const GUARD_RETRY: Duration = Duration::from_millis(5);

const TOMBSTONE_EXT: &str = "tomb";

/// Metadata written into a guard file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GuardMetadata {
    token: String,
    owner: String,
    pid: u32,
    created_at: DateTime<Utc>,
}

impl GuardMetadata {
    fn new() -> Self {
        Self {
            token: Uuid::new_v4().simple().to_string(),
            owner: owner_label(),
            pid: std::process::id(),
            created_at: Utc::now(),
        }
    }
}

/// Guard file contents as seen at one moment. `token` is `None` for a guard
/// whose metadata was never written (its creator died right after creating it).
#[derive(Debug, Clone, PartialEq, Eq)]
struct GuardSnapshot {
    token: Option<String>,
    owner: Option<String>,
    modified: SystemTime,
}

/// Outcome of [`take_guard`].
#[derive(Debug, PartialEq, Eq)]
enum Take {
    /// The expected guard was removed.
    Removed,
    /// A different guard was found and put back.
    Mismatch,
    /// No guard at the path.
    Missing,
}

/// RAII guard over one document. Dropping it removes the guard file if it
/// is still ours.
#[derive(Debug)]
pub(super) struct DocumentGuard {
    path: PathBuf,
    token: String,
}

impl DocumentGuard {
    /// Spin until the guard at `path` is ours.
    pub(super) fn acquire(path: PathBuf) -> Result<Self> {
        let started = Instant::now();
        loop {
            if let Some(token) = try_create(&path)? {
                return Ok(Self { path, token });
            }

            if break_if_stale(&path)? {
                continue;
            }

            if started.elapsed() >= GUARD_TIMEOUT {
                return Err(DocLockError::StoreError(format!(
                    "document guard '{}' still held after {}s",
                    path.display(),
                    GUARD_TIMEOUT.as_secs()
                )));
            }
            thread::sleep(GUARD_RETRY);
        }
    }
}

impl Drop for DocumentGuard {
    fn drop(&mut self) {
        let token = self.token.as_str();
        match take_guard(&self.path, |seen| seen.token.as_deref() == Some(token)) {
            Ok(Take::Removed) => {}
            Ok(Take::Mismatch) | Ok(Take::Missing) => {
                warn!(path = %self.path.display(), "document guard was broken while held");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to release document guard");
            }
        }
    }
}

/// Create the guard file exclusively. Returns the new guard's token, or
/// `None` when someone else holds it.
fn try_create(path: &Path) -> Result<Option<String>> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(DocLockError::StoreError(format!(
                "failed to create document guard '{}': {}",
                path.display(),
                e
            )));
        }
    };

    let metadata = GuardMetadata::new();
    let json = serde_json::to_vec(&metadata)
        .map_err(|e| DocLockError::StoreError(format!("failed to serialize guard: {}", e)))?;
    if let Err(e) = file.write_all(&json).and_then(|()| file.sync_all()) {
        let _ = fs::remove_file(path);
        return Err(DocLockError::StoreError(format!(
            "failed to write document guard '{}': {}",
            path.display(),
            e
        )));
    }

    Ok(Some(metadata.token))
}

/// Read the guard at `path`. `Ok(None)` when there is none.
fn snapshot(path: &Path) -> Result<Option<GuardSnapshot>> {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DocLockError::StoreError(format!(
                "failed to inspect document guard '{}': {}",
                path.display(),
                e
            )));
        }
    };

    let metadata = fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<GuardMetadata>(&content).ok());

    Ok(Some(GuardSnapshot {
        token: metadata.as_ref().map(|m| m.token.clone()),
        owner: metadata.map(|m| m.owner),
        modified,
    }))
}

fn tombstone_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        "{}.{}.{}",
        name,
        Uuid::new_v4().simple(),
        TOMBSTONE_EXT
    ))
}

/// Move the guard at `path` aside and delete it if `expected` accepts it.
///
/// A guard that is not the expected one is linked back to `path`. If a new
/// guard was created there in the meantime the link fails and the moved
/// guard is dropped with a warning.
fn take_guard(path: &Path, expected: impl Fn(&GuardSnapshot) -> bool) -> Result<Take> {
    let tombstone = tombstone_path(path);
    match fs::rename(path, &tombstone) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Take::Missing),
        Err(e) => {
            return Err(DocLockError::StoreError(format!(
                "failed to move document guard '{}': {}",
                path.display(),
                e
            )));
        }
    }

    let seen = snapshot(&tombstone)?;
    let take = if seen.as_ref().is_some_and(&expected) {
        Take::Removed
    } else {
        match fs::hard_link(&tombstone, path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(path = %path.display(), "document guard replaced while being inspected");
            }
            Err(e) => {
                let _ = fs::remove_file(&tombstone);
                return Err(DocLockError::StoreError(format!(
                    "failed to restore document guard '{}': {}",
                    path.display(),
                    e
                )));
            }
        }
        Take::Mismatch
    };

    if let Err(e) = fs::remove_file(&tombstone)
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %tombstone.display(), error = %e, "failed to remove guard tombstone");
    }
    Ok(take)
}

/// Remove the guard if it is abandoned. Returns `true` when the caller should
/// retry immediately (guard removed, gone, or changed hands).
fn break_if_stale(path: &Path) -> Result<bool> {
    let Some(observed) = snapshot(path)? else {
        return Ok(true);
    };

    let age = SystemTime::now()
        .duration_since(observed.modified)
        .unwrap_or_default();
    if age < STALE_GUARD_AGE {
        return Ok(false);
    }

    let take = take_guard(path, |seen| {
        seen.token == observed.token && seen.modified == observed.modified
    })?;
    if take == Take::Removed {
        warn!(
            path = %path.display(),
            age_secs = age.as_secs(),
            holder = observed.owner.as_deref().unwrap_or("unknown"),
            "broke abandoned document guard"
        );
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::FileTimes;
    use tempfile::TempDir;

    #[test]
    fn guard_file_exists_while_held() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");

        let guard = DocumentGuard::acquire(path.clone()).unwrap();
        assert!(path.exists());

        let meta: GuardMetadata =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(meta.pid, std::process::id());
        assert_eq!(meta.token, guard.token);

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn second_create_fails_while_held() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");

        let _guard = DocumentGuard::acquire(path.clone()).unwrap();
        assert!(try_create(&path).unwrap().is_none());
    }

    #[test]
    fn fresh_guard_is_not_broken() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");

        let _guard = DocumentGuard::acquire(path.clone()).unwrap();
        assert!(!break_if_stale(&path).unwrap());
        assert!(path.exists());
    }

    #[test]
    fn abandoned_guard_is_broken() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");

        let file = fs::File::create(&path).unwrap();
        let old = SystemTime::now() - STALE_GUARD_AGE - Duration::from_secs(5);
        file.set_times(FileTimes::new().set_modified(old)).unwrap();
        drop(file);

        // Acquisition goes through despite the leftover guard
        let guard = DocumentGuard::acquire(path.clone()).unwrap();
        assert!(path.exists());
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn guards_serialize_threads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");
        let counter = temp_dir.path().join("counter");
        fs::write(&counter, "0").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        let _guard = DocumentGuard::acquire(path.clone()).unwrap();
                        let n: u32 = fs::read_to_string(&counter).unwrap().parse().unwrap();
                        fs::write(&counter, (n + 1).to_string()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(fs::read_to_string(&counter).unwrap(), "80");
    }

    fn backdate(path: &Path) {
        let file = fs::File::options().write(true).open(path).unwrap();
        let old = SystemTime::now() - STALE_GUARD_AGE - Duration::from_secs(5);
        file.set_times(FileTimes::new().set_modified(old)).unwrap();
    }

    fn token_at(path: &Path) -> String {
        let meta: GuardMetadata =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        meta.token
    }

    fn leftover_tombstones(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|e| {
                e.as_ref().unwrap().path().extension().and_then(|x| x.to_str())
                    == Some(TOMBSTONE_EXT)
            })
            .count()
    }

    #[test]
    fn stalled_holder_does_not_release_successor_guard() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");

        let stalled = DocumentGuard::acquire(path.clone()).unwrap();
        backdate(&path);

        // Another process breaks the stale guard and takes over
        let successor = DocumentGuard::acquire(path.clone()).unwrap();
        assert_ne!(successor.token, stalled.token);

        // The stalled holder finishing must not free the successor's guard
        drop(stalled);
        assert!(path.exists());
        assert_eq!(token_at(&path), successor.token);
        assert!(try_create(&path).unwrap().is_none());

        drop(successor);
        assert!(!path.exists());
        assert_eq!(leftover_tombstones(temp_dir.path()), 0);
    }

    #[test]
    fn take_guard_puts_back_unexpected_guard() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");

        let holder = DocumentGuard::acquire(path.clone()).unwrap();
        let take = take_guard(&path, |seen| seen.token.as_deref() == Some("someone-else")).unwrap();

        assert_eq!(take, Take::Mismatch);
        assert_eq!(token_at(&path), holder.token);
        assert_eq!(leftover_tombstones(temp_dir.path()), 0);
    }

    #[test]
    fn take_guard_on_missing_guard() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");

        assert_eq!(take_guard(&path, |_| true).unwrap(), Take::Missing);
    }

    #[test]
    fn guard_without_metadata_is_broken_when_stale() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".doc.guard");
        fs::File::create(&path).unwrap();
        backdate(&path);

        assert!(break_if_stale(&path).unwrap());
        assert!(!path.exists());
        assert_eq!(leftover_tombstones(temp_dir.path()), 0);
    }
}
