//! Incremental checkpointing
//!
//! This module records fine-grained edits, batches them per file, persists
//! per-file timelines and materializes restorable checkpoints:
//! - Change recording with per-file batches and automatic triggers
//! - Append-only timelines of events and full-content snapshots
//! - Checkpoints capturing every file touched since the previous one
//! - Retention of the last N checkpoints and downsampling of old snapshots
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use tidemark_core::checkpoints::{CheckpointManager, CheckpointManagerConfig, CheckpointTrigger};
//! use tidemark_core::checkpoints::types::{ChangeAction, ChangeEvent};
//!
//! let manager = CheckpointManager::open(CheckpointManagerConfig::new("./project")).await?;
//!
//! manager
//!     .record_change(ChangeEvent::new("src/main.rs", 3, "let x = 1;", ChangeAction::Added, now))
//!     .await?;
//!
//! let checkpoint = manager
//!     .build_checkpoint(CheckpointTrigger::Manual, Some("Before refactoring".into()))
//!     .await?;
//!
//! let content = manager.read_at("src/main.rs", now).await?;
//! ```
//!
//! # Storage
//!
//! Everything lives under `.tidemark/` by default:
//! ```text
//! .tidemark/
//!   history.json                      # Ordered checkpoint summaries
//!   changes/{checkpoint_id}/
//!     checkpoint.json                 # Full checkpoint
//!   timelines/{encoded_path}/
//!     timeline.json                   # Per-file events and snapshots
//! ```

pub mod config;
pub mod manager;
pub mod minimap;
pub mod recorder;
pub mod restore;
pub mod retention;
pub mod scanner;
pub mod storage;
pub mod timeline;
pub mod types;
pub mod watcher;

pub use config::CheckpointManagerConfig;
pub use manager::{
    CheckpointManager, FileHistoryEntry, HistoryReconstruction, ManagerStatus, RecordOutcome,
};
pub use minimap::{LineProfile, project, project_with_profile};
pub use restore::RestorePreview;
pub use scanner::{PathFilter, WorkspaceScanner};
pub use storage::{CheckpointStorage, FileCheckpointStorage};
pub use timeline::TimelineStore;
pub use types::{
    ChangeAction, ChangeEvent, Checkpoint, CheckpointFile, CheckpointId, CheckpointMetadata,
    CheckpointSummary, CheckpointTrigger, FileChangeBatch, Minimap, MinimapKind, MinimapPoint,
    RestoreFailure, RestoreOptions, RestoreResult, SnapshotEntry, Timeline,
};
pub use watcher::{WorkspaceChange, WorkspaceWatcher};
