//! Tests for the namespaced cache.

use super::*;
use crate::store::{FileStore, MemoryStore, Store};
use serde_json::json;
use tempfile::TempDir;

fn cache(namespace: &str) -> NamespaceCache<MemoryStore> {
    NamespaceCache::new(namespace, Arc::new(MemoryStore::new())).unwrap()
}

#[test]
fn test_get_missing_key_is_not_found() {
    let cache = cache("users");
    let err = cache.get("42").unwrap_err();

    assert!(matches!(err, DocLockError::NotFound(ref id) if id == "users:42"));
    assert!(!cache.contains("42").unwrap());
}

#[test]
fn test_set_get_delete() {
    let cache = cache("users");
    cache.set("42", &json!({"name": "Ada"})).unwrap();

    assert!(cache.contains("42").unwrap());
    assert_eq!(cache.get("42").unwrap(), json!({"name": "Ada"}));

    assert!(cache.delete("42").unwrap());
    assert!(!cache.delete("42").unwrap());
    assert!(cache.get("42").is_err());
}

#[test]
fn test_null_value_is_still_present() {
    let cache = cache("users");
    cache.set("nothing", &Value::Null).unwrap();

    assert!(cache.contains("nothing").unwrap());
    assert_eq!(cache.get("nothing").unwrap(), Value::Null);
}

#[test]
fn test_keys_strip_namespace() {
    let cache = cache("users");
    cache.set("b", &json!(2)).unwrap();
    cache.set("a", &json!(1)).unwrap();
    cache.set("with:colon", &json!(3)).unwrap();

    assert_eq!(cache.keys().unwrap(), vec!["a", "b", "with:colon"]);
}

#[test]
fn test_namespaces_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    let short = NamespaceCache::new("ab", Arc::clone(&store)).unwrap();
    let long = NamespaceCache::new("abc", Arc::clone(&store)).unwrap();

    short.set("k", &json!("short")).unwrap();
    long.set("k", &json!("long")).unwrap();

    assert_eq!(short.keys().unwrap(), vec!["k"]);
    assert_eq!(short.remove_all().unwrap(), 1);
    assert_eq!(long.get("k").unwrap(), json!("long"));
}

#[test]
fn test_invalid_namespaces_rejected() {
    let store = Arc::new(MemoryStore::new());
    assert!(NamespaceCache::new("", Arc::clone(&store)).is_err());
    assert!(NamespaceCache::new("a:b", store).is_err());
}

#[test]
fn test_creation_lock_uses_formatted_key() {
    let cache = cache("thumbs");
    let lock = cache.creation_lock("img-1").with_owner("worker-1");

    assert_eq!(lock.identifier(), "thumbs:img-1");
    assert!(lock.acquire_write(false).unwrap());

    let rival = cache.creation_lock("img-1").with_owner("worker-2");
    assert!(!rival.acquire_write(false).unwrap());

    // Another key is independent
    let other = cache.creation_lock("img-2").with_owner("worker-2");
    assert!(other.acquire_write(false).unwrap());
}

#[test]
fn test_regenerate_under_creation_lock() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn Store> = Arc::new(FileStore::open(temp_dir.path()).unwrap());
    let cache = NamespaceCache::new("reports", store).unwrap();

    let lock = cache.creation_lock("daily");
    assert!(lock.acquire_write(true).unwrap());
    if !cache.contains("daily").unwrap() {
        cache.set("daily", &json!({"rows": 3})).unwrap();
    }
    lock.release_write().unwrap();

    assert_eq!(cache.get("daily").unwrap(), json!({"rows": 3}));
    assert_eq!(cache.remove_all().unwrap(), 1);
    assert!(cache.keys().unwrap().is_empty());
}
