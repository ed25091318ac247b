//! Directory-backed document store.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   locks/
//!     job%3A42.json      lock record for "job:42"
//!     .job%3A42.guard    present while an update of "job:42" is in flight
//!   cache/
//!     users%3A7.json     cache entry for "users:7"
//! ```
//!
//! Documents are written with atomic rename, so reads never need a guard.
//! Read-modify-write updates of lock documents hold the document's guard.
//! Cache writes are blind replacements and need none.

mod guard;
mod naming;

use super::{CacheStore, LockFilter, LockStore, LockUpdate};
use crate::error::{DocLockError, Result};
use crate::fs::atomic_write;
use crate::locks::LockRecord;
use guard::DocumentGuard;
use naming::{DOCUMENT_EXT, decode_id, document_file_name, guard_file_name};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

const LOCKS_DIR: &str = "locks";
const CACHE_DIR: &str = "cache";

/// Cache document as stored on disk.
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    id: String,
    value: Value,
}

/// Document store rooted at a (possibly shared) directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    locks_dir: PathBuf,
    cache_dir: PathBuf,
}

impl FileStore {
    /// Open the store at `root`, creating its directories if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let locks_dir = root.join(LOCKS_DIR);
        let cache_dir = root.join(CACHE_DIR);

        for dir in [&locks_dir, &cache_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                DocLockError::StoreError(format!(
                    "failed to create store directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            root,
            locks_dir,
            cache_dir,
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock_path(&self, id: &str) -> PathBuf {
        self.locks_dir.join(document_file_name(id))
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.cache_dir.join(document_file_name(id))
    }

    /// Run `f` while holding the guard of lock document `id`.
    fn guarded<T>(&self, id: &str, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        let _guard = DocumentGuard::acquire(self.locks_dir.join(guard_file_name(id)))?;
        f(&self.lock_path(id))
    }
}

impl LockStore for FileStore {
    fn find_lock(&self, id: &str) -> Result<Option<LockRecord>> {
        read_document(&self.lock_path(id))
    }

    fn list_locks(&self) -> Result<Vec<LockRecord>> {
        let mut records = Vec::new();
        for id in list_document_ids(&self.locks_dir)? {
            // A record can vanish between listing and reading
            if let Some(record) = read_document(&self.lock_path(&id))? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn delete_lock(&self, id: &str, filter: &LockFilter) -> Result<Option<LockRecord>> {
        self.guarded(id, |path| match read_document::<LockRecord>(path)? {
            Some(record) if filter.matches(&record) => {
                remove_document(path)?;
                Ok(Some(record))
            }
            _ => Ok(None),
        })
    }

    fn upsert_lock(&self, id: &str, filter: &LockFilter, update: &LockUpdate) -> Result<bool> {
        self.guarded(id, |path| match read_document::<LockRecord>(path)? {
            None => {
                write_document(path, &update.insert(id))?;
                Ok(true)
            }
            Some(mut record) if filter.matches(&record) => {
                update.apply(&mut record);
                write_document(path, &record)?;
                Ok(true)
            }
            Some(_) => Ok(false),
        })
    }

    fn pull_reader(&self, id: &str, label: &str) -> Result<()> {
        self.guarded(id, |path| {
            let Some(mut record) = read_document::<LockRecord>(path)? else {
                return Ok(());
            };
            if !record.readers.iter().any(|r| r == label) {
                return Ok(());
            }

            record.readers.retain(|r| r != label);
            if record.is_empty() {
                remove_document(path)?;
            } else {
                write_document(path, &record)?;
            }
            Ok(())
        })
    }
}

impl CacheStore for FileStore {
    fn get_entry(&self, id: &str) -> Result<Option<Value>> {
        Ok(read_document::<CacheDocument>(&self.entry_path(id))?.map(|doc| doc.value))
    }

    fn put_entry(&self, id: &str, value: &Value) -> Result<()> {
        let doc = CacheDocument {
            id: id.to_string(),
            value: value.clone(),
        };
        write_document(&self.entry_path(id), &doc)
    }

    fn delete_entry(&self, id: &str) -> Result<bool> {
        remove_document(&self.entry_path(id))
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut removed = 0;
        for id in self.ids_with_prefix(prefix)? {
            if remove_document(&self.entry_path(&id))? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(list_document_ids(&self.cache_dir)?
            .into_iter()
            .filter(|id| id.starts_with(prefix))
            .collect())
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DocLockError::StoreError(format!(
                "failed to read document '{}': {}",
                path.display(),
                e
            )));
        }
    };

    serde_json::from_str(&content).map(Some).map_err(|e| {
        DocLockError::StoreError(format!(
            "failed to parse document '{}': {}",
            path.display(),
            e
        ))
    })
}

fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(doc)
        .map_err(|e| DocLockError::StoreError(format!("failed to serialize document: {}", e)))?;
    atomic_write(path, &json)
}

fn remove_document(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DocLockError::StoreError(format!(
            "failed to remove document '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Decoded ids of all documents in `dir`, sorted. Dot files and names that
/// do not decode are skipped.
fn list_document_ids(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        DocLockError::StoreError(format!(
            "failed to read store directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            DocLockError::StoreError(format!("failed to read store directory entry: {}", e))
        })?;

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with('.') {
            continue;
        }
        match decode_id(stem) {
            Ok(id) => ids.push(id),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping undecodable document"),
        }
    }

    ids.sort();
    Ok(ids)
}
