//! Checkpoint manager
//!
//! This module provides the high-level engine API, orchestrating change
//! recording, checkpoint creation, restoration and retention.
//!
//! Locks are always taken in the same order: the per-file lock, then the
//! recorder, then the history mirror.

mod core;
mod operations;
#[cfg(test)]
mod tests;
mod types;

pub use types::{
    CheckpointManager, FileHistoryEntry, HistoryReconstruction, ManagerStatus, RecordOutcome,
};
