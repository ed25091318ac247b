//! Lock record stored in the lock collection.

use super::types::LockState;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One lock document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Lock identifier (document key).
    pub id: String,

    /// Label of the write holder.
    #[serde(default)]
    pub owner: Option<String>,

    /// Labels of the read holders, without duplicates.
    #[serde(default)]
    pub readers: Vec<String>,

    /// Time of the last successful acquisition.
    pub timestamp: DateTime<Utc>,
}

impl LockRecord {
    /// Create an empty record.
    pub fn new(id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            owner: None,
            readers: Vec::new(),
            timestamp,
        }
    }

    /// No owner and no readers.
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.readers.is_empty()
    }

    /// Holder state encoded by the record.
    pub fn state(&self) -> LockState {
        match &self.owner {
            Some(owner) => LockState::WriteHeld(owner.clone()),
            None if self.readers.is_empty() => LockState::Unlocked,
            None => LockState::ReadHeld(self.readers.len()),
        }
    }

    /// Time since the last acquisition.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.timestamp)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();

        if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds.max(0))
        }
    }

    /// Whether the record would be reclaimed by an acquisition at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, expiration: Duration) -> bool {
        now.checked_sub_signed(expiration)
            .is_some_and(|cutoff| self.timestamp <= cutoff)
    }
}
