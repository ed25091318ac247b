//! Error types for doclock.
//!
//! Uses thiserror for derive macros. Contention on a non-waiting acquire is
//! not an error in the library API (it is reported as `Ok(false)`); the
//! `LockContention` variant exists for the CLI, which turns that outcome into
//! an exit code.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for doclock operations.
#[derive(Error, Debug)]
pub enum DocLockError {
    /// Invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// The backing store failed. Never retried by the lock protocol.
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// A cache key has no entry.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A non-waiting acquisition did not get the lock.
    #[error("Lock is held: {0}")]
    LockContention(String),

    /// A waiting acquisition exceeded its wait bound.
    #[error("Timed out waiting for lock '{identifier}' after {waited_ms}ms ({attempts} attempts)")]
    LockTimeout {
        identifier: String,
        waited_ms: u64,
        attempts: u32,
    },
}

impl DocLockError {
    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DocLockError::UserError(_) => exit_codes::USER_ERROR,
            DocLockError::StoreError(_) => exit_codes::STORE_FAILURE,
            DocLockError::NotFound(_) => exit_codes::NOT_FOUND,
            DocLockError::LockContention(_) => exit_codes::LOCK_CONTENTION,
            DocLockError::LockTimeout { .. } => exit_codes::LOCK_TIMEOUT,
        }
    }
}

/// Result type alias for doclock operations.
pub type Result<T> = std::result::Result<T, DocLockError>;
