//! Tidemark Core Library
//!
//! This crate provides the incremental checkpointing engine: change
//! recording, per-file timelines, checkpoints, retention and restore,
//! together with its configuration and error types.

pub mod checkpoints;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod persist;

// Re-export commonly used types
pub use checkpoints::{
    ChangeAction, ChangeEvent, Checkpoint, CheckpointId, CheckpointManager,
    CheckpointManagerConfig, CheckpointSummary, CheckpointTrigger, RestoreOptions, RestoreResult,
};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use config::{LogFormat, LoggingConfig, TidemarkConfig, load_config};
pub use error::{ResultExt, TidemarkError, TidemarkResult};
pub use host::{FsHost, WorkspaceHost};
