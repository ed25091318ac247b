//! Lock modes, states and status snapshots.

use super::record::LockRecord;
use std::fmt;

/// Kind of hold requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared hold; excludes writers only.
    Read,
    /// Exclusive hold; excludes readers and other writers.
    Write,
}

impl LockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Read => "read",
            LockMode::Write => "write",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holder state of one lock identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No record, or a record with neither owner nor readers.
    Unlocked,
    /// `n >= 1` readers, no owner.
    ReadHeld(usize),
    /// A single write owner, no readers.
    WriteHeld(String),
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked => f.write_str("unlocked"),
            LockState::ReadHeld(n) => write!(f, "read-held ({} readers)", n),
            LockState::WriteHeld(owner) => write!(f, "write-held by {}", owner),
        }
    }
}

/// Snapshot of a lock, as returned by `LockCoordinator::status`.
#[derive(Debug, Clone)]
pub struct LockStatus {
    /// The lock identifier.
    pub identifier: String,

    /// The stored record, if any.
    pub record: Option<LockRecord>,

    /// Holder state.
    pub state: LockState,

    /// Whether the next acquisition attempt would reclaim the record.
    pub expired: bool,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record {
            None => write!(f, "{} ({})", self.identifier, self.state),
            Some(record) => write!(
                f,
                "{} ({}, age: {}{})",
                self.identifier,
                self.state,
                record.age_string(),
                if self.expired { ", EXPIRED" } else { "" }
            ),
        }
    }
}
