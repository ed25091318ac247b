//! `doclock cache ...` commands.

use super::Session;
use crate::cache::NamespaceCache;
use crate::cli::{CacheAction, CacheCommand};
use crate::error::{DocLockError, Result};
use serde_json::Value;

/// Dispatch cache subcommands.
pub(super) fn dispatch_cache(session: &Session, cache_cmd: CacheCommand) -> Result<()> {
    let namespace = cache_cmd
        .namespace
        .unwrap_or_else(|| session.config.default_namespace.clone());
    let cache = NamespaceCache::new(namespace, session.store.clone())?;

    match cache_cmd.action {
        CacheAction::Get(args) => {
            let value = cache.get(&args.key)?;
            println!("{}", to_pretty(&value)?);
        }
        CacheAction::Set(args) => {
            cache.set(&args.key, &parse_value(&args.value))?;
        }
        CacheAction::Delete(args) => {
            if !cache.delete(&args.key)? {
                return Err(DocLockError::NotFound(cache.format_key(&args.key)));
            }
        }
        CacheAction::Keys => {
            for key in cache.keys()? {
                println!("{}", key);
            }
        }
        CacheAction::Clear => {
            let removed = cache.remove_all()?;
            println!(
                "Removed {} entr{} from namespace '{}'",
                removed,
                if removed == 1 { "y" } else { "ies" },
                cache.namespace()
            );
        }
    }

    Ok(())
}

/// Parse a command-line value as JSON, falling back to a JSON string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn to_pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DocLockError::UserError(format!("failed to render value: {}", e)))
}
