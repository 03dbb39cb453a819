//! Engine configuration model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::logging_config::LoggingConfig;
use crate::error::{TidemarkError, TidemarkResult};

/// Default name of the metadata directory inside a workspace
pub const DEFAULT_STORAGE_DIR: &str = ".tidemark";

/// Tunable thresholds and paths for the checkpoint engine
///
/// Every numeric threshold lives here rather than in the engine so hosts can
/// trade storage growth against history density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidemarkConfig {
    /// Metadata directory, relative to the workspace root unless absolute
    pub storage_dir: PathBuf,

    /// Age after which an open batch is flushed to its timeline
    #[serde(with = "humantime_serde")]
    pub flush_window: Duration,

    /// Elapsed time since the last checkpoint that triggers an automatic one
    #[serde(with = "humantime_serde")]
    pub checkpoint_interval: Duration,

    /// Number of recorded events since the last checkpoint that triggers an automatic one
    pub edit_threshold: usize,

    /// Maximum number of checkpoints kept in history
    pub max_checkpoints: usize,

    /// Width of a downsampling bucket
    #[serde(with = "humantime_serde")]
    pub downsample_bucket: Duration,

    /// Snapshots on a multiple of this offset from the bucket start survive downsampling
    #[serde(with = "humantime_serde")]
    pub downsample_sample_interval: Duration,

    /// How often the watch loop runs snapshot downsampling
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,

    /// Cap on the read buffer used when streaming a file line by line
    pub stream_chunk_size: usize,

    /// Glob patterns (relative to the workspace root) that are never tracked
    pub ignored_paths: Vec<String>,

    /// Debounce applied to filesystem events by the watcher
    #[serde(with = "humantime_serde")]
    pub watch_debounce: Duration,

    /// Logging settings for hosts that install a subscriber
    pub logging: LoggingConfig,
}

impl Default for TidemarkConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            flush_window: Duration::from_secs(5),
            checkpoint_interval: Duration::from_secs(60),
            edit_threshold: 10,
            max_checkpoints: 20,
            downsample_bucket: Duration::from_secs(60 * 60),
            downsample_sample_interval: Duration::from_secs(5 * 60),
            cleanup_interval: Duration::from_secs(60 * 60),
            stream_chunk_size: 1024 * 1024,
            ignored_paths: vec!["**/*.swp".to_string(), "**/.DS_Store".to_string()],
            watch_debounce: Duration::from_secs(1),
            logging: LoggingConfig::default(),
        }
    }
}

impl TidemarkConfig {
    /// Set max checkpoints
    pub fn with_max_checkpoints(mut self, max: usize) -> Self {
        self.max_checkpoints = max;
        self
    }

    /// Set the batch flush window
    pub fn with_flush_window(mut self, window: Duration) -> Self {
        self.flush_window = window;
        self
    }

    /// Set the automatic checkpoint interval
    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set the automatic checkpoint edit threshold
    pub fn with_edit_threshold(mut self, threshold: usize) -> Self {
        self.edit_threshold = threshold;
        self
    }

    /// Add an ignore pattern
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignored_paths.push(pattern.into());
        self
    }

    /// Flush window in milliseconds
    pub fn flush_window_ms(&self) -> i64 {
        duration_ms(self.flush_window)
    }

    /// Checkpoint interval in milliseconds
    pub fn checkpoint_interval_ms(&self) -> i64 {
        duration_ms(self.checkpoint_interval)
    }

    /// Downsampling bucket width in milliseconds
    pub fn downsample_bucket_ms(&self) -> i64 {
        duration_ms(self.downsample_bucket)
    }

    /// Downsampling sample interval in milliseconds
    pub fn downsample_sample_interval_ms(&self) -> i64 {
        duration_ms(self.downsample_sample_interval)
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> TidemarkResult<()> {
        if self.max_checkpoints == 0 {
            return Err(TidemarkError::invalid_input_field(
                "max_checkpoints must be at least 1",
                "max_checkpoints",
            ));
        }
        if self.edit_threshold == 0 {
            return Err(TidemarkError::invalid_input_field(
                "edit_threshold must be at least 1",
                "edit_threshold",
            ));
        }
        if self.downsample_bucket_ms() <= 0 {
            return Err(TidemarkError::invalid_input_field(
                "downsample_bucket must be at least 1ms",
                "downsample_bucket",
            ));
        }
        if self.downsample_sample_interval_ms() <= 0 {
            return Err(TidemarkError::invalid_input_field(
                "downsample_sample_interval must be at least 1ms",
                "downsample_sample_interval",
            ));
        }
        if self.stream_chunk_size == 0 {
            return Err(TidemarkError::invalid_input_field(
                "stream_chunk_size must be at least 1 byte",
                "stream_chunk_size",
            ));
        }
        for pattern in &self.ignored_paths {
            glob::Pattern::new(pattern)?;
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reconciled_policy() {
        let config = TidemarkConfig::default();
        assert_eq!(config.flush_window_ms(), 5_000);
        assert_eq!(config.checkpoint_interval_ms(), 60_000);
        assert_eq!(config.edit_threshold, 10);
        assert_eq!(config.max_checkpoints, 20);
        assert_eq!(config.downsample_bucket_ms(), 3_600_000);
        assert_eq!(config.downsample_sample_interval_ms(), 300_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let config = TidemarkConfig::default().with_max_checkpoints(0);
        let err = config.validate().unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let config = TidemarkConfig::default().ignore("src/**x");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_humantime_round_trip() {
        let json = r#"{ "flush_window": "250ms", "checkpoint_interval": "5m" }"#;
        let config: TidemarkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.flush_window_ms(), 250);
        assert_eq!(config.checkpoint_interval_ms(), 300_000);
        assert_eq!(config.max_checkpoints, 20);
    }
}
