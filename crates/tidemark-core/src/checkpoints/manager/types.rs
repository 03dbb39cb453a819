//! Checkpoint manager types and construction

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::super::config::CheckpointManagerConfig;
use super::super::recorder::ChangeRecorder;
use super::super::scanner::PathFilter;
use super::super::storage::{CheckpointStorage, FileCheckpointStorage};
use super::super::timeline::TimelineStore;
use super::super::types::{Checkpoint, CheckpointId, CheckpointSummary, Timeline};
use crate::clock::{Clock, Millis, SystemClock};
use crate::error::{TidemarkError, TidemarkResult};
use crate::host::{FsHost, WorkspaceHost};

/// What a single recorded edit caused
#[derive(Debug, Clone, Default)]
pub struct RecordOutcome {
    /// The file's batch was flushed to its timeline
    pub flushed: bool,
    /// An automatic checkpoint was built
    pub checkpoint: Option<Checkpoint>,
}

/// One checkpoint's view of a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHistoryEntry {
    pub checkpoint_id: CheckpointId,
    pub timestamp: Millis,
    pub description: String,
    pub changes: Vec<super::super::types::ChangeEvent>,
    pub snapshot: String,
}

/// Snapshots of a file within a time range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryReconstruction {
    pub file_path: String,
    /// Content at the start of the range, if any snapshot precedes it
    pub initial_content: Option<String>,
    /// Snapshots inside the range, oldest first
    pub steps: Timeline,
    /// Content at the end of the range
    pub final_content: Option<String>,
}

/// Counters describing the engine's current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerStatus {
    pub checkpoints: usize,
    pub has_initial_state: bool,
    pub open_batches: Vec<String>,
    pub pending_files: Vec<String>,
    pub events_since_checkpoint: usize,
    pub last_checkpoint_time: Millis,
    pub tracked_files: usize,
}

/// Checkpoint manager for recording edits, building and restoring checkpoints
pub struct CheckpointManager {
    pub(super) config: CheckpointManagerConfig,
    pub(super) storage: Arc<dyn CheckpointStorage>,
    pub(super) timelines: TimelineStore,
    pub(super) host: Arc<dyn WorkspaceHost>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) filter: PathFilter,
    /// Batch map; held for the whole of a flush or build
    pub(super) recorder: Mutex<ChangeRecorder>,
    /// Mirror of the history document, oldest first
    pub(super) history: RwLock<Vec<CheckpointSummary>>,
    /// Per-file queues serializing record and restore for one path
    pub(super) file_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CheckpointManager {
    /// Open the manager for a workspace on the local filesystem
    pub async fn open(config: CheckpointManagerConfig) -> TidemarkResult<Self> {
        let host = Arc::new(
            FsHost::new(&config.project_root).with_chunk_size(config.settings.stream_chunk_size),
        );
        Self::with_host(config, host, Arc::new(SystemClock)).await
    }

    /// Open with a custom host and clock
    pub async fn with_host(
        config: CheckpointManagerConfig,
        host: Arc<dyn WorkspaceHost>,
        clock: Arc<dyn Clock>,
    ) -> TidemarkResult<Self> {
        let storage = Arc::new(FileCheckpointStorage::new(&config.storage_path));
        Self::with_storage(config, storage, host, clock).await
    }

    /// Open with custom storage, host and clock
    pub async fn with_storage(
        config: CheckpointManagerConfig,
        storage: Arc<dyn CheckpointStorage>,
        host: Arc<dyn WorkspaceHost>,
        clock: Arc<dyn Clock>,
    ) -> TidemarkResult<Self> {
        config.settings.validate()?;
        let filter = PathFilter::new(&config.storage_path, &config.settings.ignored_paths)?;
        let history = storage.load_history().await?;
        reconcile_orphans(storage.as_ref(), &history).await?;

        let last_checkpoint_time = history
            .last()
            .map_or_else(|| clock.now_millis(), |s| s.timestamp);
        let recorder = ChangeRecorder::new(config.recorder_policy(), last_checkpoint_time);

        tracing::debug!(
            "Opened checkpoint manager at {:?} with {} checkpoints",
            config.storage_path,
            history.len()
        );

        Ok(Self {
            timelines: TimelineStore::new(&config.storage_path),
            config,
            storage,
            host,
            clock,
            filter,
            recorder: Mutex::new(recorder),
            history: RwLock::new(history),
            file_locks: DashMap::new(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &CheckpointManagerConfig {
        &self.config
    }

    /// Path filter applied to scans and watch events
    pub fn path_filter(&self) -> &PathFilter {
        &self.filter
    }

    // Internal helper methods

    fn file_lock(&self, path: &str) -> Arc<Mutex<()>> {
        self.file_locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Run `f` holding the per-file lock of `path`
    ///
    /// The lock entry is dropped from the map once no other task holds or
    /// waits on it.
    pub(super) async fn with_file_lock<F, Fut, T>(&self, path: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.file_lock(path);
        let result = {
            let _guard = lock.lock().await;
            f().await
        };
        drop(lock);
        self.file_locks
            .remove_if(path, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Number of per-file locks currently in use
    pub fn active_file_locks(&self) -> usize {
        self.file_locks.len()
    }

    pub(super) async fn load_checkpoint_or_error(
        &self,
        id: &CheckpointId,
    ) -> TidemarkResult<Checkpoint> {
        self.storage.load(id).await?.ok_or_else(|| {
            TidemarkError::not_found_resource(format!("Checkpoint {} not found", id), "checkpoint")
        })
    }
}

/// Remove checkpoints that were written but never listed in history
async fn reconcile_orphans(
    storage: &dyn CheckpointStorage,
    history: &[CheckpointSummary],
) -> TidemarkResult<()> {
    let listed: HashSet<&CheckpointId> = history.iter().map(|s| &s.id).collect();
    for id in storage.stored_ids().await? {
        if !listed.contains(&id) {
            tracing::warn!("Removing orphaned checkpoint {}", id);
            storage.delete(&id).await?;
        }
    }
    Ok(())
}
