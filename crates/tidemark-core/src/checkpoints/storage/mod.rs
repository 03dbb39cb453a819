//! Checkpoint storage implementations
//!
//! This module provides storage backends for persisting checkpoints and the
//! history document that orders them.

use crate::error::TidemarkResult;
use async_trait::async_trait;

use super::types::{Checkpoint, CheckpointId, CheckpointSummary};

mod file_storage;

#[cfg(test)]
mod memory_storage;


pub use file_storage::FileCheckpointStorage;

#[cfg(test)]
pub use memory_storage::MemoryCheckpointStorage;

/// Trait for checkpoint storage backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Save a checkpoint
    async fn save(&self, checkpoint: &Checkpoint) -> TidemarkResult<()>;

    /// Load a checkpoint by ID
    async fn load(&self, id: &CheckpointId) -> TidemarkResult<Option<Checkpoint>>;

    /// Delete a checkpoint and everything stored with it
    async fn delete(&self, id: &CheckpointId) -> TidemarkResult<()>;

    /// Check if a checkpoint exists
    async fn exists(&self, id: &CheckpointId) -> TidemarkResult<bool>;

    /// Ids of every checkpoint present in storage, listed or not
    async fn stored_ids(&self) -> TidemarkResult<Vec<CheckpointId>>;

    /// Load the ordered history (oldest first)
    async fn load_history(&self) -> TidemarkResult<Vec<CheckpointSummary>>;

    /// Replace the history document
    async fn save_history(&self, history: &[CheckpointSummary]) -> TidemarkResult<()>;
}
