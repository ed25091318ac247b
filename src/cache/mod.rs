//! Namespaced key/value cache over a document store.
//!
//! Entries of namespace `ns` are stored under ids `ns:<key>`. The namespace
//! may not contain `:`, so the `ns:` prefix never matches another
//! namespace's entries.

#[cfg(test)]
mod tests;

use crate::error::{DocLockError, Result};
use crate::locks::LockCoordinator;
use crate::store::{CacheStore, LockStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const SEPARATOR: char = ':';

/// Cache view restricted to one namespace.
#[derive(Debug)]
pub struct NamespaceCache<S: CacheStore + ?Sized> {
    namespace: String,
    prefix: String,
    store: Arc<S>,
}

impl<S: CacheStore + ?Sized> NamespaceCache<S> {
    /// Create a cache for `namespace`.
    ///
    /// # Returns
    ///
    /// * `Err(DocLockError::UserError)` - Namespace is empty or contains `:`
    pub fn new(namespace: impl Into<String>, store: Arc<S>) -> Result<Self> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(DocLockError::UserError(
                "cache namespace must not be empty".to_string(),
            ));
        }
        if namespace.contains(SEPARATOR) {
            return Err(DocLockError::UserError(format!(
                "cache namespace '{}' must not contain '{}'",
                namespace, SEPARATOR
            )));
        }

        let prefix = format!("{}{}", namespace, SEPARATOR);
        Ok(Self {
            namespace,
            prefix,
            store,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store id of `key` in this namespace.
    pub fn format_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Value stored under `key`.
    ///
    /// # Returns
    ///
    /// * `Err(DocLockError::NotFound)` - No entry for `key`
    pub fn get(&self, key: &str) -> Result<Value> {
        let id = self.format_key(key);
        self.store
            .get_entry(&id)?
            .ok_or(DocLockError::NotFound(id))
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.store.get_entry(&self.format_key(key))?.is_some())
    }

    /// Insert or replace the value under `key`.
    pub fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.store.put_entry(&self.format_key(key), value)
    }

    /// Delete `key`. Deleting an absent key is not an error.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete_entry(&self.format_key(key))
    }

    /// Keys of this namespace, without the namespace prefix, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .ids_with_prefix(&self.prefix)?
            .into_iter()
            .filter_map(|id| id.strip_prefix(&self.prefix).map(String::from))
            .collect())
    }

    /// Delete every entry of this namespace. Returns the number removed.
    pub fn remove_all(&self) -> Result<usize> {
        let removed = self.store.delete_prefix(&self.prefix)?;
        debug!(namespace = %self.namespace, removed, "cleared cache namespace");
        Ok(removed)
    }
}

impl<S: CacheStore + LockStore + ?Sized> NamespaceCache<S> {
    /// Lock guarding the (re)generation of the entry under `key`.
    ///
    /// Shares the namespaced id with the entry, in the store's lock collection.
    pub fn creation_lock(&self, key: &str) -> LockCoordinator<S> {
        LockCoordinator::new(Arc::clone(&self.store), self.format_key(key))
    }
}
