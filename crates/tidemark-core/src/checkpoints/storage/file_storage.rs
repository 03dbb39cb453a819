//! File-based checkpoint storage implementation

use crate::error::{TidemarkError, TidemarkResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::super::types::{Checkpoint, CheckpointId, CheckpointSummary};
use super::CheckpointStorage;
use crate::persist::{self, Loaded};

const CHECKPOINT_FILE: &str = "checkpoint.json";
const HISTORY_FILE: &str = "history.json";

/// File-based checkpoint storage
///
/// Stores checkpoints in a directory structure:
/// ```text
/// base_path/
///   changes/
///     {checkpoint_id}/
///       checkpoint.json
///   history.json
/// ```
pub struct FileCheckpointStorage {
    base_path: PathBuf,
}

impl FileCheckpointStorage {
    /// Create a new file-based storage
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Base directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the changes directory
    fn changes_dir(&self) -> PathBuf {
        self.base_path.join("changes")
    }

    /// Directory holding one checkpoint
    pub fn checkpoint_dir(&self, id: &CheckpointId) -> PathBuf {
        self.changes_dir().join(id.as_str())
    }

    fn checkpoint_path(&self, id: &CheckpointId) -> PathBuf {
        self.checkpoint_dir(id).join(CHECKPOINT_FILE)
    }

    fn history_path(&self) -> PathBuf {
        self.base_path.join(HISTORY_FILE)
    }
}

#[async_trait]
impl CheckpointStorage for FileCheckpointStorage {
    async fn save(&self, checkpoint: &Checkpoint) -> TidemarkResult<()> {
        let path = self.checkpoint_path(&checkpoint.id);
        persist::write_json(&path, checkpoint).await?;
        tracing::debug!("Saved checkpoint {} to {:?}", checkpoint.id, path);
        Ok(())
    }

    async fn load(&self, id: &CheckpointId) -> TidemarkResult<Option<Checkpoint>> {
        match persist::read_json::<Checkpoint>(&self.checkpoint_path(id)).await? {
            Loaded::Found(checkpoint) => Ok(Some(checkpoint)),
            Loaded::Missing => Ok(None),
            Loaded::Corrupt(reason) => {
                tracing::warn!("Checkpoint {} is corrupt, ignoring it: {}", id, reason);
                Ok(None)
            }
        }
    }

    async fn delete(&self, id: &CheckpointId) -> TidemarkResult<()> {
        let dir = self.checkpoint_dir(id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!("Deleted checkpoint {}", id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TidemarkError::storage(format!(
                "Failed to delete checkpoint {}: {}",
                id, e
            ))),
        }
    }

    async fn exists(&self, id: &CheckpointId) -> TidemarkResult<bool> {
        Ok(fs::try_exists(self.checkpoint_path(id))
            .await
            .unwrap_or(false))
    }

    async fn stored_ids(&self) -> TidemarkResult<Vec<CheckpointId>> {
        let mut ids = Vec::new();
        let mut entries = match fs::read_dir(self.changes_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => {
                return Err(TidemarkError::storage(format!(
                    "Failed to read changes directory: {}",
                    e
                )));
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TidemarkError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                ids.push(CheckpointId::from_string(
                    entry.file_name().to_string_lossy(),
                ));
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn load_history(&self) -> TidemarkResult<Vec<CheckpointSummary>> {
        match persist::read_json::<Vec<CheckpointSummary>>(&self.history_path()).await? {
            Loaded::Found(history) => Ok(history),
            Loaded::Missing => Ok(Vec::new()),
            Loaded::Corrupt(reason) => {
                tracing::warn!("History document is corrupt, starting empty: {}", reason);
                Ok(Vec::new())
            }
        }
    }

    async fn save_history(&self, history: &[CheckpointSummary]) -> TidemarkResult<()> {
        persist::write_json(&self.history_path(), history).await
    }
}
