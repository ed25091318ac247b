//! Document store collaborators.
//!
//! The lock protocol and the namespaced cache never touch storage directly;
//! they go through the two traits defined here. Every method is atomic with
//! respect to a single document, which is the only guarantee the lock
//! protocol relies on.
//!
//! # Backends
//!
//! - [`MemoryStore`]: one mutex around in-process maps. Coordinates threads
//!   of a single process.
//! - [`FileStore`]: one JSON file per document under a shared directory.
//!   Lock documents are mutated while holding a per-document guard file
//!   created with exclusive-create semantics, so processes on different
//!   machines can coordinate through a shared filesystem.
//!
//! [`StoreRegistry`] maps a target string to an opened backend. Handles are
//! passed explicitly to coordinators and caches; there is no global registry.

mod file;
mod filter;
mod memory;
mod registry;


pub use file::FileStore;
pub use filter::{LockFilter, LockUpdate};
pub use memory::MemoryStore;
pub use registry::{StoreRegistry, StoreTarget};

use crate::error::Result;
use crate::locks::LockRecord;
use serde_json::Value;

/// Lock collection: one [`LockRecord`] per lock identifier.
pub trait LockStore: Send + Sync {
    /// Fetch the record for `id`, if any.
    fn find_lock(&self, id: &str) -> Result<Option<LockRecord>>;

    /// All lock records, sorted by identifier.
    fn list_locks(&self) -> Result<Vec<LockRecord>>;

    /// Delete the record for `id` if it matches `filter`.
    ///
    /// Returns the deleted record.
    fn delete_lock(&self, id: &str, filter: &LockFilter) -> Result<Option<LockRecord>>;

    /// Conditional insert-or-update.
    ///
    /// - No record: a new record with `update` applied is inserted, returns `true`.
    /// - Record matching `filter`: `update` is applied, returns `true`.
    /// - Record not matching `filter`: nothing changes, returns `false`.
    fn upsert_lock(&self, id: &str, filter: &LockFilter, update: &LockUpdate) -> Result<bool>;

    /// Remove `label` from the readers of `id`. Removing an absent label is a
    /// no-op. A record left with no owner and no readers is deleted.
    fn pull_reader(&self, id: &str, label: &str) -> Result<()>;
}

/// Cache collection: one opaque JSON value per namespaced key.
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `id`.
    fn get_entry(&self, id: &str) -> Result<Option<Value>>;

    /// Insert or replace the value stored under `id`.
    fn put_entry(&self, id: &str, value: &Value) -> Result<()>;

    /// Delete the entry under `id`. Returns whether one existed.
    fn delete_entry(&self, id: &str) -> Result<bool>;

    /// Delete every entry whose id starts with `prefix`. Returns the count.
    fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    /// Ids starting with `prefix`, sorted.
    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// A backend holding both collections.
pub trait Store: LockStore + CacheStore {}

impl<T: LockStore + CacheStore> Store for T {}
