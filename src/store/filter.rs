//! Conditions and updates for lock documents.
//!
//! Backends evaluate these while holding whatever makes the document update
//! atomic, so the protocol only ever asks "does the record look like X, and if
//! so change it to Y" in one step.

use crate::locks::LockRecord;
use chrono::{DateTime, Utc};

/// Condition a lock record must satisfy for a delete or update to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockFilter {
    /// Matches every record.
    Any,
    /// No write owner (readers allowed).
    Unowned,
    /// No write owner and no readers.
    Free,
    /// Write owner equals the label.
    OwnedBy(String),
    /// Last refreshed at or before the cutoff.
    ExpiredAt(DateTime<Utc>),
}

impl LockFilter {
    pub fn matches(&self, record: &LockRecord) -> bool {
        match self {
            LockFilter::Any => true,
            LockFilter::Unowned => record.owner.is_none(),
            LockFilter::Free => record.owner.is_none() && record.readers.is_empty(),
            LockFilter::OwnedBy(label) => record.owner.as_deref() == Some(label.as_str()),
            LockFilter::ExpiredAt(cutoff) => record.timestamp <= *cutoff,
        }
    }
}

/// Change applied to a lock record by a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockUpdate {
    /// Add a reader (set semantics) and refresh the timestamp.
    AddReader {
        label: String,
        timestamp: DateTime<Utc>,
    },
    /// Take write ownership and refresh the timestamp.
    SetOwner {
        label: String,
        timestamp: DateTime<Utc>,
    },
}

impl LockUpdate {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LockUpdate::AddReader { timestamp, .. } | LockUpdate::SetOwner { timestamp, .. } => {
                *timestamp
            }
        }
    }

    pub fn apply(&self, record: &mut LockRecord) {
        match self {
            LockUpdate::AddReader { label, timestamp } => {
                if !record.readers.contains(label) {
                    record.readers.push(label.clone());
                }
                record.timestamp = *timestamp;
            }
            LockUpdate::SetOwner { label, timestamp } => {
                record.owner = Some(label.clone());
                record.timestamp = *timestamp;
            }
        }
    }

    /// The record created when an upsert finds no document.
    pub fn insert(&self, id: &str) -> LockRecord {
        let mut record = LockRecord::new(id, self.timestamp());
        self.apply(&mut record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(owner: Option<&str>, readers: &[&str]) -> LockRecord {
        LockRecord {
            id: "job:1".to_string(),
            owner: owner.map(String::from),
            readers: readers.iter().map(|r| r.to_string()).collect(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn unowned_allows_readers() {
        assert!(LockFilter::Unowned.matches(&record(None, &["a", "b"])));
        assert!(!LockFilter::Unowned.matches(&record(Some("w"), &[])));
    }

    #[test]
    fn free_requires_no_owner_and_no_readers() {
        assert!(LockFilter::Free.matches(&record(None, &[])));
        assert!(!LockFilter::Free.matches(&record(None, &["a"])));
        assert!(!LockFilter::Free.matches(&record(Some("w"), &[])));
    }

    #[test]
    fn owned_by_matches_exact_label() {
        let held = record(Some("w"), &[]);
        assert!(LockFilter::OwnedBy("w".to_string()).matches(&held));
        assert!(!LockFilter::OwnedBy("x".to_string()).matches(&held));
        assert!(!LockFilter::OwnedBy("w".to_string()).matches(&record(None, &[])));
    }

    #[test]
    fn expired_at_is_inclusive() {
        let r = record(None, &[]);
        assert!(LockFilter::ExpiredAt(r.timestamp).matches(&r));
        assert!(!LockFilter::ExpiredAt(r.timestamp - Duration::seconds(1)).matches(&r));
    }

    #[test]
    fn add_reader_has_set_semantics() {
        let now = Utc::now();
        let update = LockUpdate::AddReader {
            label: "a".to_string(),
            timestamp: now,
        };
        let mut r = record(None, &["a"]);
        update.apply(&mut r);

        assert_eq!(r.readers, vec!["a".to_string()]);
        assert_eq!(r.timestamp, now);
    }

    #[test]
    fn insert_builds_fresh_record() {
        let now = Utc::now();
        let r = LockUpdate::SetOwner {
            label: "w".to_string(),
            timestamp: now,
        }
        .insert("job:9");

        assert_eq!(r.id, "job:9");
        assert_eq!(r.owner.as_deref(), Some("w"));
        assert!(r.readers.is_empty());
        assert_eq!(r.timestamp, now);
    }
}
