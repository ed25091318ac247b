//! Command implementations for doclock.
//!
//! This module resolves the configuration and the store once per invocation,
//! then routes each CLI command to its handler.

mod cache;
mod lock;

use crate::cli::{Cli, Command};
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::Result;
use crate::owner::owner_label;
use crate::store::{Store, StoreRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolved configuration and opened store for one invocation.
pub(crate) struct Session {
    pub(crate) config: Config,
    pub(crate) store: Arc<dyn Store>,
}

impl Session {
    /// Resolve config (file, then environment, then `--store`) and open the store.
    pub(crate) fn open(
        registry: &StoreRegistry,
        store_override: Option<&str>,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Config::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Config::load(DEFAULT_CONFIG_FILE)?,
            None => Config::default(),
        }
        .apply_env();

        if let Some(store) = store_override {
            config.store = store.to_string();
        }
        config.validate()?;

        let store = registry.open(&config.store)?;
        Ok(Self { config, store })
    }
}

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    if let Command::Owner = cli.command {
        println!("{}", owner_label());
        return Ok(());
    }

    let registry = StoreRegistry::new();
    let session = Session::open(
        &registry,
        cli.store.as_deref(),
        cli.config.as_ref().map(PathBuf::as_path),
    )?;

    let result = match cli.command {
        Command::Lock(lock_cmd) => lock::dispatch_lock(&session, lock_cmd),
        Command::Cache(cache_cmd) => cache::dispatch_cache(&session, cache_cmd),
        Command::Owner => Ok(()),
    };

    registry.clear();
    result
}
