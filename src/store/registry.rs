//! Explicit registry of opened stores.
//!
//! Owns the mapping from a target string to a shared store handle. Nothing is
//! cached process-wide: callers create a registry, open targets through it,
//! hand the resulting `Arc`s to coordinators and caches, and close targets
//! when done.

use super::{FileStore, MemoryStore, Store};
use crate::error::{DocLockError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const MEMORY_SCHEME: &str = "memory://";
const FILE_SCHEME: &str = "file://";

/// Parsed store target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreTarget {
    /// `memory://<name>`: in-process store shared by everyone opening the same name.
    Memory(String),
    /// `file://<path>` or a bare path: directory-backed store.
    File(PathBuf),
}

impl StoreTarget {
    pub fn parse(target: &str) -> Result<Self> {
        let target = target.trim();
        if target.is_empty() {
            return Err(DocLockError::UserError(
                "store target must not be empty".to_string(),
            ));
        }

        if let Some(name) = target.strip_prefix(MEMORY_SCHEME) {
            return Ok(StoreTarget::Memory(name.to_string()));
        }

        let path = target.strip_prefix(FILE_SCHEME).unwrap_or(target);
        if path.is_empty() {
            return Err(DocLockError::UserError(format!(
                "store target '{}' has no path",
                target
            )));
        }
        if path.contains("://") {
            return Err(DocLockError::UserError(format!(
                "unsupported store target '{}' (expected memory://, file:// or a path)",
                target
            )));
        }
        Ok(StoreTarget::File(PathBuf::from(path)))
    }

    fn open(&self) -> Result<Arc<dyn Store>> {
        match self {
            StoreTarget::Memory(_) => Ok(Arc::new(MemoryStore::new())),
            StoreTarget::File(path) => Ok(Arc::new(FileStore::open(path)?)),
        }
    }
}

impl fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreTarget::Memory(name) => write!(f, "{}{}", MEMORY_SCHEME, name),
            StoreTarget::File(path) => write!(f, "{}{}", FILE_SCHEME, path.display()),
        }
    }
}

/// Registry of opened stores keyed by target.
#[derive(Default)]
pub struct StoreRegistry {
    stores: Mutex<HashMap<StoreTarget, Arc<dyn Store>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn stores(&self) -> MutexGuard<'_, HashMap<StoreTarget, Arc<dyn Store>>> {
        self.stores.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Open `target`, or return the handle already opened for it.
    pub fn open(&self, target: &str) -> Result<Arc<dyn Store>> {
        let target = StoreTarget::parse(target)?;
        let mut stores = self.stores();

        if let Some(store) = stores.get(&target) {
            return Ok(Arc::clone(store));
        }

        let store = target.open()?;
        debug!(target = %target, "opened store");
        stores.insert(target, Arc::clone(&store));
        Ok(store)
    }

    /// Drop the registry's handle for `target`. Outstanding `Arc`s stay valid.
    ///
    /// Returns whether the target was open.
    pub fn close(&self, target: &str) -> Result<bool> {
        let target = StoreTarget::parse(target)?;
        let closed = self.stores().remove(&target).is_some();
        if closed {
            debug!(target = %target, "closed store");
        }
        Ok(closed)
    }

    /// Close every target.
    pub fn clear(&self) {
        self.stores().clear();
    }

    /// Number of open targets.
    pub fn len(&self) -> usize {
        self.stores().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<String> = self.stores().keys().map(|t| t.to_string()).collect();
        f.debug_struct("StoreRegistry")
            .field("targets", &targets)
            .finish()
    }
}
