//! In-memory checkpoint storage implementation

use crate::error::TidemarkResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::super::types::{Checkpoint, CheckpointId, CheckpointSummary};
use super::CheckpointStorage;

/// In-memory checkpoint storage (for testing)
#[derive(Default)]
pub struct MemoryCheckpointStorage {
    checkpoints: RwLock<HashMap<String, Checkpoint>>,
    history: RwLock<Vec<CheckpointSummary>>,
}

impl MemoryCheckpointStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStorage for MemoryCheckpointStorage {
    async fn save(&self, checkpoint: &Checkpoint) -> TidemarkResult<()> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.insert(checkpoint.id.as_str().to_string(), checkpoint.clone());
        Ok(())
    }

    async fn load(&self, id: &CheckpointId) -> TidemarkResult<Option<Checkpoint>> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(id.as_str()).cloned())
    }

    async fn delete(&self, id: &CheckpointId) -> TidemarkResult<()> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.remove(id.as_str());
        Ok(())
    }

    async fn exists(&self, id: &CheckpointId) -> TidemarkResult<bool> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.contains_key(id.as_str()))
    }

    async fn stored_ids(&self) -> TidemarkResult<Vec<CheckpointId>> {
        let checkpoints = self.checkpoints.read().await;
        let mut ids: Vec<_> = checkpoints
            .keys()
            .map(|k| CheckpointId::from_string(k.clone()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn load_history(&self) -> TidemarkResult<Vec<CheckpointSummary>> {
        Ok(self.history.read().await.clone())
    }

    async fn save_history(&self, history: &[CheckpointSummary]) -> TidemarkResult<()> {
        *self.history.write().await = history.to_vec();
        Ok(())
    }
}
