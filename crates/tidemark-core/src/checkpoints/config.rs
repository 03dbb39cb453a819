//! Checkpoint manager configuration

use std::path::PathBuf;

use super::recorder::RecorderPolicy;
use crate::config::TidemarkConfig;

/// Configuration for checkpoint manager
#[derive(Debug, Clone)]
pub struct CheckpointManagerConfig {
    /// Project root directory
    pub project_root: PathBuf,
    /// Base directory for checkpoints, timelines and history
    pub storage_path: PathBuf,
    /// Engine thresholds
    pub settings: TidemarkConfig,
}

impl CheckpointManagerConfig {
    /// Create config for `project_root` with default settings
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_settings(project_root, TidemarkConfig::default())
    }

    /// Create config for `project_root`; a relative `storage_dir` is resolved against it
    pub fn with_settings(project_root: impl Into<PathBuf>, settings: TidemarkConfig) -> Self {
        let project_root = project_root.into();
        let storage_path = if settings.storage_dir.is_absolute() {
            settings.storage_dir.clone()
        } else {
            project_root.join(&settings.storage_dir)
        };
        Self {
            project_root,
            storage_path,
            settings,
        }
    }

    /// Set storage path
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Set max checkpoints
    pub fn with_max_checkpoints(mut self, max: usize) -> Self {
        self.settings.max_checkpoints = max;
        self
    }

    pub(crate) fn recorder_policy(&self) -> RecorderPolicy {
        RecorderPolicy {
            flush_window_ms: self.settings.flush_window_ms(),
            checkpoint_interval_ms: self.settings.checkpoint_interval_ms(),
            edit_threshold: self.settings.edit_threshold,
        }
    }
}
