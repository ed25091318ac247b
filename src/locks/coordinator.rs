//! Lock acquisition, release and reclamation for one identifier.

use super::record::LockRecord;
use super::types::{LockMode, LockState, LockStatus};
use super::wait::WaitPolicy;
use crate::error::{DocLockError, Result};
use crate::owner::owner_label;
use crate::store::{LockFilter, LockStore, LockUpdate};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Default age after which a lock record is reclaimed.
pub const DEFAULT_EXPIRATION_SECS: u64 = 900;

/// Longest accepted expiration window (ten years).
pub const MAX_EXPIRATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Convert an expiration in seconds, rejecting zero and values above
/// [`MAX_EXPIRATION_SECS`].
pub fn expiration_from_secs(secs: u64) -> Result<Duration> {
    if secs == 0 || secs > MAX_EXPIRATION_SECS {
        return Err(DocLockError::UserError(format!(
            "lock expiration must be between 1 and {} seconds, got {}",
            MAX_EXPIRATION_SECS, secs
        )));
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| {
            DocLockError::UserError(format!("lock expiration of {} seconds is out of range", secs))
        })
}

/// Protocol driver for the lock named `identifier`.
///
/// Holds no lock state of its own: everything lives in the store, so any
/// number of coordinators (in any number of processes) may exist for the
/// same identifier.
#[derive(Debug)]
pub struct LockCoordinator<S: LockStore + ?Sized> {
    store: Arc<S>,
    identifier: String,
    owner: Option<String>,
    expiration: Duration,
    policy: WaitPolicy,
}

impl<S: LockStore + ?Sized> Clone for LockCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identifier: self.identifier.clone(),
            owner: self.owner.clone(),
            expiration: self.expiration,
            policy: self.policy,
        }
    }
}

impl<S: LockStore + ?Sized> LockCoordinator<S> {
    /// Coordinator for `identifier` with the default expiration and wait policy.
    ///
    /// The owner label is derived from the calling thread on every call.
    pub fn new(store: Arc<S>, identifier: impl Into<String>) -> Self {
        Self {
            store,
            identifier: identifier.into(),
            owner: None,
            expiration: Duration::seconds(DEFAULT_EXPIRATION_SECS as i64),
            policy: WaitPolicy::default(),
        }
    }

    /// Use a fixed owner label instead of the calling thread's.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Override the expiration window. Non-positive or oversized windows
    /// are rejected.
    pub fn with_expiration(mut self, expiration: Duration) -> Result<Self> {
        let secs = u64::try_from(expiration.num_seconds()).unwrap_or(0);
        if expiration <= Duration::zero() || secs > MAX_EXPIRATION_SECS {
            return Err(DocLockError::UserError(format!(
                "lock expiration must be between 1 and {} seconds, got {}s",
                MAX_EXPIRATION_SECS,
                expiration.num_seconds()
            )));
        }
        self.expiration = expiration;
        Ok(self)
    }

    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Label written into the record by acquisitions from this call site.
    pub fn owner_label(&self) -> String {
        self.owner.clone().unwrap_or_else(owner_label)
    }

    /// Delete the record if it is older than the expiration window.
    ///
    /// Runs at the start of every acquisition attempt, whatever the record
    /// holds. Returns the "now" used as the new timestamp by the attempt.
    pub fn reclaim_expired(&self) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        let cutoff = now.checked_sub_signed(self.expiration).ok_or_else(|| {
            DocLockError::UserError(format!(
                "lock expiration {}s is out of range",
                self.expiration.num_seconds()
            ))
        })?;

        if let Some(record) = self
            .store
            .delete_lock(&self.identifier, &LockFilter::ExpiredAt(cutoff))?
        {
            warn!(
                identifier = %self.identifier,
                owner = record.owner.as_deref().unwrap_or("-"),
                readers = record.readers.len(),
                age_secs = record.age().num_seconds(),
                "reclaimed expired lock"
            );
        }

        Ok(now)
    }

    /// Acquire a read lock.
    ///
    /// Succeeds unless a writer holds the lock; other readers never block it.
    /// With `wait == false` a held lock yields `Ok(false)`. With `wait == true`
    /// the attempt is repeated per the wait policy.
    pub fn acquire_read(&self, wait: bool) -> Result<bool> {
        self.acquire(LockMode::Read, wait)
    }

    /// Remove this owner from the readers. Not holding a read lock is fine.
    pub fn release_read(&self) -> Result<()> {
        let label = self.owner_label();
        self.store.pull_reader(&self.identifier, &label)?;
        debug!(identifier = %self.identifier, owner = %label, "released read lock");
        Ok(())
    }

    /// Acquire the write lock.
    ///
    /// Succeeds only when there is neither a writer nor any reader.
    pub fn acquire_write(&self, wait: bool) -> Result<bool> {
        self.acquire(LockMode::Write, wait)
    }

    /// Release the write lock if this owner holds it; otherwise do nothing.
    pub fn release_write(&self) -> Result<()> {
        let label = self.owner_label();
        let released = self
            .store
            .delete_lock(&self.identifier, &LockFilter::OwnedBy(label.clone()))?
            .is_some();
        debug!(identifier = %self.identifier, owner = %label, released, "released write lock");
        Ok(())
    }

    /// Current state of the lock. Does not reclaim anything.
    pub fn status(&self) -> Result<LockStatus> {
        let record = self.store.find_lock(&self.identifier)?;
        let state = record
            .as_ref()
            .map(LockRecord::state)
            .unwrap_or(LockState::Unlocked);
        let expired = record
            .as_ref()
            .is_some_and(|r| r.is_expired_at(Utc::now(), self.expiration));

        Ok(LockStatus {
            identifier: self.identifier.clone(),
            record,
            state,
            expired,
        })
    }

    fn acquire(&self, mode: LockMode, wait: bool) -> Result<bool> {
        let label = self.owner_label();
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            let now = self.reclaim_expired()?;
            let (filter, update) = match mode {
                LockMode::Read => (
                    LockFilter::Unowned,
                    LockUpdate::AddReader {
                        label: label.clone(),
                        timestamp: now,
                    },
                ),
                LockMode::Write => (
                    LockFilter::Free,
                    LockUpdate::SetOwner {
                        label: label.clone(),
                        timestamp: now,
                    },
                ),
            };

            if self.store.upsert_lock(&self.identifier, &filter, &update)? {
                debug!(identifier = %self.identifier, owner = %label, %mode, attempts, "acquired lock");
                return Ok(true);
            }
            attempts += 1;

            if !wait {
                debug!(identifier = %self.identifier, owner = %label, %mode, "lock is held");
                return Ok(false);
            }

            let delay = self
                .policy
                .next_delay(&self.identifier, attempts, started.elapsed())?;
            std::thread::sleep(delay);
        }
    }
}
