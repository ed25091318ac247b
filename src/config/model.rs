//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "doclock.yaml";

/// Environment variable that overrides the configured store target.
pub const STORE_ENV_VAR: &str = "DOCLOCK_STORE";

/// Configuration for doclock.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Store settings
    // =========================================================================
    /// Store target: `memory://<name>`, `file://<path>`, or a bare directory path.
    #[serde(default = "default_store")]
    pub store: String,

    /// Namespace used by cache commands when none is given.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Seconds after which a lock record is treated as abandoned and reclaimed.
    #[serde(default = "default_lock_expiration_secs")]
    pub lock_expiration_secs: u64,

    /// Sleep between attempts of a waiting acquisition, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on the time a waiting acquisition may block (unbounded if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wait_secs: Option<u64>,

    /// Upper bound on attempts of a waiting acquisition (unbounded if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: default_store(),
            default_namespace: default_namespace(),
            lock_expiration_secs: default_lock_expiration_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: None,
            max_attempts: None,
        }
    }
}

// Default value functions for serde
pub(crate) fn default_store() -> String {
    ".doclock".to_string()
}
pub(crate) fn default_namespace() -> String {
    "default".to_string()
}
pub(crate) fn default_lock_expiration_secs() -> u64 {
    900
}
pub(crate) fn default_poll_interval_ms() -> u64 {
    200
}
