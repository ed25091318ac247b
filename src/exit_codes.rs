//! Exit code constants for the doclock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Store failure (I/O, corrupt document, guard timeout)
//! - 3: Cache key not found
//! - 4: Lock contention (non-waiting acquire did not get the lock)
//! - 5: Lock wait timed out

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Store failure: the backing document store could not complete an operation.
pub const STORE_FAILURE: i32 = 2;

/// The requested cache entry does not exist.
pub const NOT_FOUND: i32 = 3;

/// Lock contention: a non-waiting acquisition found the lock unavailable.
pub const LOCK_CONTENTION: i32 = 4;

/// A waiting acquisition exceeded its configured wait bound.
pub const LOCK_TIMEOUT: i32 = 5;
