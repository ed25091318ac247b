//! Polling policy for waiting acquisitions.

use crate::error::DocLockError;
use std::time::Duration;

/// Default sleep between attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How a waiting acquisition polls, and when it gives up.
///
/// The default polls every 200ms forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Sleep between attempts.
    pub poll_interval: Duration,

    /// Give up once this much time has passed since the first attempt.
    pub max_wait: Option<Duration>,

    /// Give up after this many failed attempts.
    pub max_attempts: Option<u32>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
            max_attempts: None,
        }
    }
}

impl WaitPolicy {
    /// Unbounded polling at `interval`.
    pub fn polling(interval: Duration) -> Self {
        Self {
            poll_interval: interval,
            ..Self::default()
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sleep before the next attempt, or the timeout error if the budget is spent.
    ///
    /// `attempts` counts the failed attempts so far; `elapsed` is the time since
    /// the first one started. The returned sleep never overshoots `max_wait`.
    pub(super) fn next_delay(
        &self,
        identifier: &str,
        attempts: u32,
        elapsed: Duration,
    ) -> Result<Duration, DocLockError> {
        let timeout = || DocLockError::LockTimeout {
            identifier: identifier.to_string(),
            waited_ms: elapsed.as_millis() as u64,
            attempts,
        };

        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(timeout());
        }

        match self.max_wait {
            Some(max) if elapsed >= max => Err(timeout()),
            Some(max) => Ok(self.poll_interval.min(max - elapsed)),
            None => Ok(self.poll_interval),
        }
    }
}
