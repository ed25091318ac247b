//! CLI argument parsing for doclock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::locks::LockMode;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// doclock: reader/writer locks and a namespaced cache in a shared document store.
///
/// Locks and cache entries are documents in a store shared by every process
/// that points at the same target (a directory, possibly on a network
/// filesystem). Abandoned locks are reclaimed after the expiration window.
#[derive(Parser, Debug)]
#[command(name = "doclock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Store target (`file://<dir>`, a directory path, or `memory://<name>`).
    ///
    /// Overrides the config file and the DOCLOCK_STORE environment variable.
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Path to the YAML config file (default: ./doclock.yaml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for doclock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lock management commands.
    ///
    /// Inspect, acquire, release, or clear locks.
    Lock(LockCommand),

    /// Cache commands.
    ///
    /// Read and write entries of a cache namespace.
    Cache(CacheCommand),

    /// Print the owner label of this process' main thread.
    Owner,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all lock records with their holders and age.
    List,

    /// Show the state of one lock.
    Status(LockIdArgs),

    /// Acquire a lock and leave it held.
    ///
    /// Prints the owner label, which must be passed to `lock release`.
    Acquire(LockAcquireArgs),

    /// Release a lock held by the given owner.
    Release(LockReleaseArgs),

    /// Delete a lock record.
    ///
    /// Only expired records are cleared unless --force is given.
    Clear(LockClearArgs),
}

/// Lock mode argument.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Read,
    Write,
}

impl From<ModeArg> for LockMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Read => LockMode::Read,
            ModeArg::Write => LockMode::Write,
        }
    }
}

/// Arguments naming a single lock.
#[derive(Parser, Debug)]
pub struct LockIdArgs {
    /// Lock identifier (e.g., "job:42").
    pub lock_id: String,
}

/// Arguments for the `lock acquire` command.
#[derive(Parser, Debug)]
pub struct LockAcquireArgs {
    /// Lock identifier (e.g., "job:42").
    pub lock_id: String,

    /// Lock mode.
    #[arg(long, value_enum, default_value = "write")]
    pub mode: ModeArg,

    /// Poll until the lock is available (bounded by max_wait_secs/max_attempts).
    #[arg(long)]
    pub wait: bool,

    /// Owner label to record (default: this process' label).
    #[arg(long)]
    pub owner: Option<String>,
}

/// Arguments for the `lock release` command.
#[derive(Parser, Debug)]
pub struct LockReleaseArgs {
    /// Lock identifier (e.g., "job:42").
    pub lock_id: String,

    /// Lock mode.
    #[arg(long, value_enum, default_value = "write")]
    pub mode: ModeArg,

    /// Owner label printed by `lock acquire`.
    #[arg(long)]
    pub owner: String,
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Lock identifier whose record should be deleted.
    pub lock_id: String,

    /// Clear the record even if it has not expired.
    #[arg(long)]
    pub force: bool,
}

/// Cache subcommands.
#[derive(Parser, Debug)]
pub struct CacheCommand {
    /// Namespace (default: `default_namespace` from the config).
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub action: CacheAction,
}

/// Available cache actions.
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print the JSON value stored under a key.
    Get(CacheKeyArgs),

    /// Store a JSON value under a key.
    Set(CacheSetArgs),

    /// Delete a key.
    Delete(CacheKeyArgs),

    /// List the keys of the namespace.
    Keys,

    /// Delete every entry of the namespace.
    Clear,
}

/// Arguments naming a cache key.
#[derive(Parser, Debug)]
pub struct CacheKeyArgs {
    /// Key within the namespace.
    pub key: String,
}

/// Arguments for the `cache set` command.
#[derive(Parser, Debug)]
pub struct CacheSetArgs {
    /// Key within the namespace.
    pub key: String,

    /// JSON value (plain text that is not valid JSON is stored as a string).
    pub value: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
