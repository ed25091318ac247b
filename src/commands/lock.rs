//! `doclock lock ...` commands.

use super::Session;
use crate::cli::{LockAcquireArgs, LockAction, LockClearArgs, LockCommand, LockIdArgs, LockReleaseArgs};
use crate::error::{DocLockError, Result};
use crate::locks::{LockCoordinator, LockMode, LockRecord};
use crate::owner::owner_label;
use crate::store::{LockFilter, Store};
use chrono::Utc;
use tracing::info;

/// Dispatch lock subcommands.
pub(super) fn dispatch_lock(session: &Session, lock_cmd: LockCommand) -> Result<()> {
    match lock_cmd.action {
        LockAction::List => cmd_lock_list(session),
        LockAction::Status(args) => cmd_lock_status(session, args),
        LockAction::Acquire(args) => cmd_lock_acquire(session, args),
        LockAction::Release(args) => cmd_lock_release(session, args),
        LockAction::Clear(args) => cmd_lock_clear(session, args),
    }
}

fn coordinator(session: &Session, lock_id: &str) -> Result<LockCoordinator<dyn Store>> {
    Ok(LockCoordinator::new(session.store.clone(), lock_id)
        .with_expiration(session.config.expiration()?)?
        .with_wait_policy(session.config.wait_policy()))
}

fn print_record(record: &LockRecord, expired: bool) {
    println!("  {} ({}):", record.id, record.state());
    if let Some(owner) = &record.owner {
        println!("    Owner:      {}", owner);
    }
    for reader in &record.readers {
        println!("    Reader:     {}", reader);
    }
    println!("    Refreshed:  {}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("    Age:        {}", record.age_string());
    if expired {
        println!("    Status:     EXPIRED (reclaimed by the next acquisition)");
    }
}

fn cmd_lock_list(session: &Session) -> Result<()> {
    let records = session.store.list_locks()?;

    if records.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", records.len());
    println!();

    let now = Utc::now();
    let expiration = session.config.expiration()?;
    let mut expired_count = 0;
    for record in &records {
        let expired = record.is_expired_at(now, expiration);
        if expired {
            expired_count += 1;
        }
        print_record(record, expired);
        println!();
    }

    if expired_count > 0 {
        println!(
            "Note: {} lock(s) are expired. Use `doclock lock clear <lock-id>` to delete them now.",
            expired_count
        );
    }

    Ok(())
}

fn cmd_lock_status(session: &Session, args: LockIdArgs) -> Result<()> {
    let status = coordinator(session, &args.lock_id)?.status()?;
    match &status.record {
        Some(record) => print_record(record, status.expired),
        None => println!("{}", status),
    }
    Ok(())
}

fn cmd_lock_acquire(session: &Session, args: LockAcquireArgs) -> Result<()> {
    let owner = args.owner.unwrap_or_else(owner_label);
    let lock = coordinator(session, &args.lock_id)?.with_owner(owner.clone());
    let mode = LockMode::from(args.mode);

    let acquired = match mode {
        LockMode::Read => lock.acquire_read(args.wait)?,
        LockMode::Write => lock.acquire_write(args.wait)?,
    };

    if !acquired {
        let holder = lock
            .status()?
            .record
            .map(|r| format!(" ({})", r.state()))
            .unwrap_or_default();
        return Err(DocLockError::LockContention(format!(
            "cannot take {} lock on '{}'{}",
            mode, args.lock_id, holder
        )));
    }

    info!(lock_id = %args.lock_id, %mode, owner = %owner, "lock acquired from CLI");
    println!("{}", owner);
    Ok(())
}

fn cmd_lock_release(session: &Session, args: LockReleaseArgs) -> Result<()> {
    let lock = coordinator(session, &args.lock_id)?.with_owner(args.owner.clone());
    let mode = LockMode::from(args.mode);

    match mode {
        LockMode::Read => lock.release_read()?,
        LockMode::Write => lock.release_write()?,
    }

    println!("Released {} lock on {} for {}", mode, args.lock_id, args.owner);
    Ok(())
}

fn cmd_lock_clear(session: &Session, args: LockClearArgs) -> Result<()> {
    let record = session.store.find_lock(&args.lock_id)?.ok_or_else(|| {
        DocLockError::UserError(format!("lock '{}' does not exist", args.lock_id))
    })?;

    let now = Utc::now();
    let expiration = session.config.expiration()?;
    let expired = record.is_expired_at(now, expiration);

    if !expired && !args.force {
        return Err(DocLockError::UserError(format!(
            "refusing to clear lock '{}': it is held ({}) and has not expired.\n\n\
             Clearing a live lock lets another owner in while the holder is still working.\n\
             Only clear it if you are certain the holder has crashed:\n  doclock lock clear {} --force",
            args.lock_id,
            record.state(),
            args.lock_id
        )));
    }

    let filter = if args.force {
        LockFilter::Any
    } else {
        LockFilter::ExpiredAt(now - expiration)
    };
    let cleared = session
        .store
        .delete_lock(&args.lock_id, &filter)?
        .ok_or_else(|| {
            DocLockError::UserError(format!(
                "lock '{}' changed while clearing; inspect it again",
                args.lock_id
            ))
        })?;

    info!(lock_id = %args.lock_id, force = args.force, "lock cleared from CLI");
    println!("Cleared lock: {}", cleared.id);
    println!();
    println!("Lock details:");
    print_record(&cleared, expired);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::tests::run;
    use crate::exit_codes;
    use crate::store::{FileStore, LockStore};
    use tempfile::TempDir;

    fn store_arg(temp_dir: &TempDir) -> String {
        temp_dir.path().display().to_string()
    }

    #[test]
    fn acquire_then_contend_then_release() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_arg(&temp_dir);

        run(&["lock", "acquire", "job:1", "--owner", "A", "--store", store.as_str()]).unwrap();

        let err = run(&["lock", "acquire", "job:1", "--owner", "B", "--store", store.as_str()])
            .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::LOCK_CONTENTION);

        run(&["lock", "release", "job:1", "--owner", "A", "--store", store.as_str()]).unwrap();
        run(&["lock", "acquire", "job:1", "--owner", "B", "--store", store.as_str()]).unwrap();

        let record = FileStore::open(temp_dir.path())
            .unwrap()
            .find_lock("job:1")
            .unwrap()
            .unwrap();
        assert_eq!(record.owner.as_deref(), Some("B"));
    }

    #[test]
    fn shared_read_locks() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_arg(&temp_dir);

        for owner in ["A", "B"] {
            run(&[
                "lock", "acquire", "job:3", "--mode", "read", "--owner", owner, "--store", store.as_str(),
            ])
            .unwrap();
        }
        run(&["lock", "status", "job:3", "--store", store.as_str()]).unwrap();
        run(&["lock", "list", "--store", store.as_str()]).unwrap();

        let record = FileStore::open(temp_dir.path())
            .unwrap()
            .find_lock("job:3")
            .unwrap()
            .unwrap();
        assert_eq!(record.readers.len(), 2);
    }

    #[test]
    fn clear_refuses_live_lock_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_arg(&temp_dir);
        run(&["lock", "acquire", "job:9", "--owner", "C", "--store", store.as_str()]).unwrap();

        let err = run(&["lock", "clear", "job:9", "--store", store.as_str()]).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);

        run(&["lock", "clear", "job:9", "--force", "--store", store.as_str()]).unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.find_lock("job:9").unwrap().is_none());
    }

    #[test]
    fn clear_missing_lock_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_arg(&temp_dir);

        let err = run(&["lock", "clear", "job:none", "--store", store.as_str()]).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn status_of_unknown_lock_succeeds() {
        run(&["lock", "status", "job:none", "--store", "memory://t"]).unwrap();
    }
}
