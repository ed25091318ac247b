//! doclock: reader/writer locks and a namespaced cache kept in a shared
//! document store.
//!
//! Processes that cannot share memory (different hosts, different runtimes)
//! coordinate through lock documents: any number of readers or one writer per
//! lock identifier, abandoned locks reclaimed after an expiration window. The
//! typical use is making sure only one worker regenerates an expensive cache
//! entry at a time.
//!
//! ```no_run
//! use doclock::cache::NamespaceCache;
//! use doclock::store::StoreRegistry;
//! use serde_json::json;
//!
//! let registry = StoreRegistry::new();
//! let store = registry.open("file:///mnt/shared/doclock")?;
//! let cache = NamespaceCache::new("reports", store)?;
//!
//! let lock = cache.creation_lock("daily");
//! if lock.acquire_write(true)? {
//!     if !cache.contains("daily")? {
//!         cache.set("daily", &json!({"rows": 3}))?;
//!     }
//!     lock.release_write()?;
//! }
//! # Ok::<(), doclock::error::DocLockError>(())
//! ```

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod owner;
pub mod store;
