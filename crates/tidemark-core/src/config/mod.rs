//! Configuration management for Tidemark
//!
//! Settings are resolved in three layers: built-in defaults, an optional
//! config file (JSON, TOML or YAML), then `TIDEMARK_*` environment overrides.

mod env_loader;
mod file_loader;
mod logging_config;
mod model;

use std::path::Path;

use crate::error::TidemarkResult;

pub use env_loader::{apply_env_overrides, apply_overrides_from};
pub use file_loader::load_from_file;
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{DEFAULT_STORAGE_DIR, TidemarkConfig};

/// Load configuration from `path` (if given), apply environment overrides and validate
pub fn load_config(path: Option<&Path>) -> TidemarkResult<TidemarkConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => TidemarkConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}
