//! Configuration model for doclock.
//!
//! This module defines the Config struct read from a YAML file (by default
//! `doclock.yaml`). Parsing is forward compatible (unknown fields are ignored),
//! every field has a default, and values are validated after loading.

mod model;
mod operations;

#[cfg(test)]
mod tests;

pub use model::{Config, DEFAULT_CONFIG_FILE, STORE_ENV_VAR};
