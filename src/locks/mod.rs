//! Reader/writer locks kept in a shared document store.
//!
//! # Lock Records
//!
//! Each lock identifier has at most one record in the store's lock collection:
//! - `owner`: label of the write holder, if any
//! - `readers`: labels of the read holders
//! - `timestamp`: time of the last successful acquisition
//!
//! A record is created by the first successful acquisition and deleted when
//! its last holder releases. `owner` is only ever set while `readers` is
//! empty; both conditions are enforced by a single conditional upsert, so
//! correctness depends on the store applying that upsert atomically.
//!
//! # Reclamation
//!
//! Every acquisition attempt first deletes the record if its timestamp is
//! older than the expiration window (900 seconds by default), whatever it
//! holds. A crashed holder therefore blocks the lock for at most one window.
//!
//! # Waiting
//!
//! There is no wake-up signal across processes: a waiting acquisition polls
//! with a fixed sleep (200ms by default) and gives no fairness guarantee.
//! [`WaitPolicy`] optionally bounds the wait, in which case running out
//! returns [`DocLockError::LockTimeout`](crate::error::DocLockError::LockTimeout).

mod coordinator;
mod record;
mod types;
mod wait;


pub use coordinator::{
    DEFAULT_EXPIRATION_SECS, LockCoordinator, MAX_EXPIRATION_SECS, expiration_from_secs,
};
pub use record::LockRecord;
pub use types::{LockMode, LockState, LockStatus};
pub use wait::WaitPolicy;
