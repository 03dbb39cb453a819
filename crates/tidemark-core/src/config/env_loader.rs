//! Environment variable overrides
//!
//! Variables use the `TIDEMARK_` prefix. Durations accept humantime strings
//! ("5s", "1h 30m").

use super::logging_config::LogFormat;
use super::model::TidemarkConfig;
use crate::error::{TidemarkError, TidemarkResult};
use std::path::PathBuf;
use std::time::Duration;

/// Apply overrides from the process environment
pub fn apply_env_overrides(config: &mut TidemarkConfig) -> TidemarkResult<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using a custom variable lookup
pub fn apply_overrides_from<F>(config: &mut TidemarkConfig, lookup: F) -> TidemarkResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup("TIDEMARK_STORAGE_DIR") {
        config.storage_dir = PathBuf::from(dir);
    }
    if let Some(value) = lookup("TIDEMARK_FLUSH_WINDOW") {
        config.flush_window = parse_duration("TIDEMARK_FLUSH_WINDOW", &value)?;
    }
    if let Some(value) = lookup("TIDEMARK_CHECKPOINT_INTERVAL") {
        config.checkpoint_interval = parse_duration("TIDEMARK_CHECKPOINT_INTERVAL", &value)?;
    }
    if let Some(value) = lookup("TIDEMARK_EDIT_THRESHOLD") {
        config.edit_threshold = parse_count("TIDEMARK_EDIT_THRESHOLD", &value)?;
    }
    if let Some(value) = lookup("TIDEMARK_MAX_CHECKPOINTS") {
        config.max_checkpoints = parse_count("TIDEMARK_MAX_CHECKPOINTS", &value)?;
    }
    if let Some(value) = lookup("TIDEMARK_CLEANUP_INTERVAL") {
        config.cleanup_interval = parse_duration("TIDEMARK_CLEANUP_INTERVAL", &value)?;
    }
    if let Some(level) = lookup("TIDEMARK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = lookup("TIDEMARK_LOG_FORMAT") {
        config.logging.format = format
            .parse::<LogFormat>()
            .map_err(|e| TidemarkError::config(format!("Invalid TIDEMARK_LOG_FORMAT: {}", e)))?;
    }
    Ok(())
}

fn parse_duration(key: &str, value: &str) -> TidemarkResult<Duration> {
    serde_json::from_value::<humantime_serde::Serde<Duration>>(serde_json::Value::String(
        value.trim().to_string(),
    ))
    .map(humantime_serde::Serde::into_inner)
    .map_err(|e| TidemarkError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

fn parse_count(key: &str, value: &str) -> TidemarkResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| TidemarkError::config(format!("Invalid {} value '{}'", key, value)))
}
