//! Owner labels written into lock records.
//!
//! A label identifies the calling process and thread: `{host}-{pid}-{thread}-{nonce}`.
//! The nonce is a random UUID generated once per process, so a pid reused by the
//! OS after a crash never produces the label of the crashed holder. Labels are
//! only matched on release and in the readers set; they are not lease tokens.

use std::sync::LazyLock;
use uuid::Uuid;

static IDENTITY: LazyLock<OwnerIdentity> = LazyLock::new(OwnerIdentity::detect);

/// Process-wide part of every owner label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerIdentity {
    /// Host name of this machine.
    pub host: String,

    /// Process ID.
    pub pid: u32,

    /// Random per-process nonce.
    pub nonce: String,
}

impl OwnerIdentity {
    /// The identity of the running process.
    pub fn current() -> &'static OwnerIdentity {
        &IDENTITY
    }

    fn detect() -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            host,
            pid: std::process::id(),
            nonce: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Label for the given thread of this process.
    pub fn label_for_thread(&self, thread: &str) -> String {
        format!("{}-{}-{}-{}", self.host, self.pid, thread, self.nonce)
    }
}

/// Owner label of the calling thread.
pub fn owner_label() -> String {
    OwnerIdentity::current().label_for_thread(&current_thread_id())
}

/// Numeric id of the current thread.
///
/// `ThreadId::as_u64` is unstable, so the number is taken from the `Debug`
/// form (`ThreadId(7)`).
fn current_thread_id() -> String {
    let raw = format!("{:?}", std::thread::current().id());
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_stable_within_a_thread() {
        assert_eq!(owner_label(), owner_label());
    }

    #[test]
    fn label_differs_across_threads() {
        let here = owner_label();
        let there = std::thread::spawn(owner_label).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn label_contains_pid_and_nonce() {
        let identity = OwnerIdentity::current();
        let label = owner_label();

        assert!(label.contains(&format!("-{}-", identity.pid)));
        assert!(label.ends_with(&identity.nonce));
        assert_eq!(identity.nonce.len(), 32);
    }

    #[test]
    fn thread_id_is_numeric() {
        let id = current_thread_id();
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}
