//! Tests for config functionality.

use crate::config::{Config, STORE_ENV_VAR};
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.store, ".doclock");
    assert_eq!(config.default_namespace, "default");
    assert_eq!(config.lock_expiration_secs, 900);
    assert_eq!(config.poll_interval_ms, 200);
    assert!(config.max_wait_secs.is_none());
    assert!(config.max_attempts.is_none());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    assert_eq!(config.lock_expiration_secs, 900);
    assert_eq!(config.store, ".doclock");
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
store: memory://shared
poll_interval_ms: 50
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.store, "memory://shared");
    assert_eq!(config.poll_interval_ms, 50);

    // Unspecified values should use defaults
    assert_eq!(config.lock_expiration_secs, 900);
    assert_eq!(config.default_namespace, "default");
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
store: file:///var/lib/doclock
default_namespace: thumbnails
lock_expiration_secs: 60
poll_interval_ms: 25
max_wait_secs: 30
max_attempts: 100
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.store, "file:///var/lib/doclock");
    assert_eq!(config.default_namespace, "thumbnails");
    assert_eq!(config.lock_expiration_secs, 60);
    assert_eq!(config.poll_interval_ms, 25);
    assert_eq!(config.max_wait_secs, Some(30));
    assert_eq!(config.max_attempts, Some(100));
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
lock_expiration_secs: 120
some_future_field: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.lock_expiration_secs, 120);
}

#[test]
fn test_validation_rejects_zero_expiration() {
    let err = Config::from_yaml("lock_expiration_secs: 0").unwrap_err();
    assert!(err.to_string().contains("lock_expiration_secs"));
}

#[test]
fn test_validation_rejects_huge_expiration() {
    for yaml in [
        "lock_expiration_secs: 18446744073709551615",
        "lock_expiration_secs: 100000000000000000",
        "lock_expiration_secs: 10000000000000",
    ] {
        let err = Config::from_yaml(yaml).unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::USER_ERROR);
        assert!(err.to_string().contains("lock_expiration_secs"));
    }
}

#[test]
fn test_expiration_accepts_maximum() {
    let yaml = format!("lock_expiration_secs: {}", crate::locks::MAX_EXPIRATION_SECS);
    let config = Config::from_yaml(&yaml).unwrap();
    assert!(config.expiration().unwrap() > chrono::Duration::zero());
}

#[test]
fn test_expiration_rejects_unvalidated_value() {
    let config = Config {
        lock_expiration_secs: u64::MAX,
        ..Config::default()
    };
    assert!(config.expiration().is_err());
}

#[test]
fn test_validation_rejects_zero_poll_interval() {
    let err = Config::from_yaml("poll_interval_ms: 0").unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn test_validation_rejects_zero_bounds() {
    assert!(Config::from_yaml("max_wait_secs: 0").is_err());
    assert!(Config::from_yaml("max_attempts: 0").is_err());
}

#[test]
fn test_validation_rejects_empty_store() {
    assert!(Config::from_yaml("store: '  '").is_err());
}

#[test]
fn test_invalid_yaml_is_user_error() {
    let err = Config::from_yaml("poll_interval_ms: [not a number").unwrap_err();
    assert_eq!(err.exit_code(), crate::exit_codes::USER_ERROR);
}

#[test]
fn test_yaml_roundtrip_keeps_bounds() {
    let config = Config {
        max_wait_secs: Some(5),
        ..Config::default()
    };
    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("max_wait_secs: 5"));
    assert!(!yaml.contains("max_attempts"));

    let parsed = Config::from_yaml(&yaml).unwrap();
    assert_eq!(parsed.max_wait_secs, Some(5));
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("doclock.yaml");
    std::fs::write(&path, "lock_expiration_secs: 42\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.lock_expiration_secs, 42);
}

#[test]
fn test_load_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(temp_dir.path().join("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_wait_policy_from_config() {
    let config = Config::from_yaml("poll_interval_ms: 10\nmax_wait_secs: 3\n").unwrap();
    let policy = config.wait_policy();

    assert_eq!(policy.poll_interval, Duration::from_millis(10));
    assert_eq!(policy.max_wait, Some(Duration::from_secs(3)));
    assert_eq!(policy.max_attempts, None);
}

#[test]
fn test_expiration_from_config() {
    let config = Config::default();
    assert_eq!(config.expiration().unwrap(), chrono::Duration::seconds(900));
}

#[test]
#[serial]
fn test_env_overrides_store() {
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var(STORE_ENV_VAR, "memory://from-env") };
    let config = Config::default().apply_env();
    unsafe { std::env::remove_var(STORE_ENV_VAR) };

    assert_eq!(config.store, "memory://from-env");
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::set_var(STORE_ENV_VAR, "") };
    let config = Config::default().apply_env();
    unsafe { std::env::remove_var(STORE_ENV_VAR) };

    assert_eq!(config.store, ".doclock");
}
