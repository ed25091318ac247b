//! Config loading, validation, and derived settings.

use super::model::{Config, STORE_ENV_VAR};
use crate::error::{DocLockError, Result};
use crate::locks::{MAX_EXPIRATION_SECS, WaitPolicy, expiration_from_secs};
use chrono::Duration;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(DocLockError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DocLockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| DocLockError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            DocLockError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Apply environment overrides (`DOCLOCK_STORE`).
    pub fn apply_env(mut self) -> Self {
        if let Ok(store) = std::env::var(STORE_ENV_VAR)
            && !store.trim().is_empty()
        {
            self.store = store;
        }
        self
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `store` must be non-empty
    /// - `lock_expiration_secs` and `poll_interval_ms` must be positive
    /// - `lock_expiration_secs` must not exceed [`MAX_EXPIRATION_SECS`]
    /// - `max_wait_secs` and `max_attempts`, when set, must be positive
    pub fn validate(&self) -> Result<()> {
        if self.store.trim().is_empty() {
            return Err(DocLockError::UserError(
                "config validation failed: store must not be empty".to_string(),
            ));
        }

        if self.lock_expiration_secs == 0 {
            return Err(DocLockError::UserError(
                "config validation failed: lock_expiration_secs must be greater than 0"
                    .to_string(),
            ));
        }

        if self.lock_expiration_secs > MAX_EXPIRATION_SECS {
            return Err(DocLockError::UserError(format!(
                "config validation failed: lock_expiration_secs must not exceed {}",
                MAX_EXPIRATION_SECS
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(DocLockError::UserError(
                "config validation failed: poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_wait_secs == Some(0) {
            return Err(DocLockError::UserError(
                "config validation failed: max_wait_secs must be greater than 0 when set"
                    .to_string(),
            ));
        }

        if self.max_attempts == Some(0) {
            return Err(DocLockError::UserError(
                "config validation failed: max_attempts must be greater than 0 when set"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Expiration window for lock records.
    pub fn expiration(&self) -> Result<Duration> {
        expiration_from_secs(self.lock_expiration_secs).map_err(|e| {
            DocLockError::UserError(format!("config validation failed: lock_expiration_secs: {}", e))
        })
    }

    /// Wait policy for waiting acquisitions.
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: std::time::Duration::from_millis(self.poll_interval_ms),
            max_wait: self.max_wait_secs.map(std::time::Duration::from_secs),
            max_attempts: self.max_attempts,
        }
    }
}
