//! In-process document store.

use super::{CacheStore, LockFilter, LockStore, LockUpdate};
use crate::error::Result;
use crate::locks::LockRecord;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Mutex, MutexGuard};

/// Both collections behind a single mutex.
///
/// Every trait method holds the mutex for its whole duration, which makes
/// each conditional upsert atomic. Only threads of one process can share it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

#[derive(Debug, Default)]
struct Collections {
    locks: BTreeMap<String, LockRecord>,
    cache: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collections(&self) -> MutexGuard<'_, Collections> {
        // A panic while holding the mutex cannot leave a half-applied update:
        // every mutation is a single map operation.
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Store a lock record verbatim, replacing any existing one.
    #[cfg(test)]
    pub(crate) fn put_lock_record(&self, record: LockRecord) {
        self.collections().locks.insert(record.id.clone(), record);
    }
}

impl LockStore for MemoryStore {
    fn find_lock(&self, id: &str) -> Result<Option<LockRecord>> {
        Ok(self.collections().locks.get(id).cloned())
    }

    fn list_locks(&self) -> Result<Vec<LockRecord>> {
        Ok(self.collections().locks.values().cloned().collect())
    }

    fn delete_lock(&self, id: &str, filter: &LockFilter) -> Result<Option<LockRecord>> {
        let mut collections = self.collections();
        match collections.locks.entry(id.to_string()) {
            Entry::Occupied(slot) if filter.matches(slot.get()) => Ok(Some(slot.remove())),
            _ => Ok(None),
        }
    }

    fn upsert_lock(&self, id: &str, filter: &LockFilter, update: &LockUpdate) -> Result<bool> {
        let mut collections = self.collections();
        match collections.locks.entry(id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(update.insert(id));
                Ok(true)
            }
            Entry::Occupied(mut slot) if filter.matches(slot.get()) => {
                update.apply(slot.get_mut());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    fn pull_reader(&self, id: &str, label: &str) -> Result<()> {
        let mut collections = self.collections();
        let Entry::Occupied(mut slot) = collections.locks.entry(id.to_string()) else {
            return Ok(());
        };

        let record = slot.get_mut();
        let before = record.readers.len();
        record.readers.retain(|r| r != label);
        if record.readers.len() != before && record.is_empty() {
            slot.remove();
        }
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn get_entry(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.collections().cache.get(id).cloned())
    }

    fn put_entry(&self, id: &str, value: &Value) -> Result<()> {
        self.collections()
            .cache
            .insert(id.to_string(), value.clone());
        Ok(())
    }

    fn delete_entry(&self, id: &str) -> Result<bool> {
        Ok(self.collections().cache.remove(id).is_some())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut collections = self.collections();
        let before = collections.cache.len();
        collections.cache.retain(|id, _| !id.starts_with(prefix));
        Ok(before - collections.cache.len())
    }

    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .collections()
            .cache
            .keys()
            .filter(|id| id.starts_with(prefix))
            .cloned()
            .collect())
    }
}
