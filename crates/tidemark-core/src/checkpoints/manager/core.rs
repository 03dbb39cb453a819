//! Core checkpoint management operations

use crate::clock::Millis;
use crate::error::{TidemarkError, TidemarkResult};
use crate::host::normalize_path;

use super::super::minimap::project;
use super::super::restore::{RestorePreview, preview_file_restore, restore_file};
use super::super::retention::plan_downsample;
use super::super::types::{
    ChangeAction, ChangeEvent, Checkpoint, CheckpointId, CheckpointSummary, Minimap,
    RestoreFailure, RestoreOptions, RestoreResult, Timeline,
};
use super::types::{CheckpointManager, FileHistoryEntry, HistoryReconstruction, ManagerStatus};

impl CheckpointManager {
    /// List all checkpoints, oldest first
    pub async fn list_checkpoints(&self) -> Vec<CheckpointSummary> {
        self.history.read().await.clone()
    }

    /// Get a specific checkpoint
    pub async fn get_checkpoint(&self, id: &CheckpointId) -> TidemarkResult<Option<Checkpoint>> {
        self.storage.load(id).await
    }

    /// Get the latest checkpoint
    pub async fn latest_checkpoint(&self) -> TidemarkResult<Option<Checkpoint>> {
        let latest = self.history.read().await.last().map(|s| s.id.clone());
        match latest {
            Some(id) => self.storage.load(&id).await,
            None => Ok(None),
        }
    }

    /// Get checkpoint by id prefix
    pub async fn find_by_prefix(&self, prefix: &str) -> TidemarkResult<Option<Checkpoint>> {
        let found = self
            .history
            .read()
            .await
            .iter()
            .rev()
            .find(|s| s.id.as_str().starts_with(prefix))
            .map(|s| s.id.clone());
        match found {
            Some(id) => self.storage.load(&id).await,
            None => Ok(None),
        }
    }

    /// Delete a checkpoint
    ///
    /// The initial state cannot be deleted.
    pub async fn delete_checkpoint(&self, id: &CheckpointId) -> TidemarkResult<()> {
        let _recorder = self.recorder.lock().await;
        let mut history = self.history.read().await.clone();
        let Some(idx) = history.iter().position(|s| &s.id == id) else {
            return Err(TidemarkError::not_found_resource(
                format!("Checkpoint {} not found", id),
                "checkpoint",
            ));
        };
        if history[idx].is_initial_state {
            return Err(TidemarkError::invalid_input_field(
                format!("Checkpoint {} is the initial state and cannot be deleted", id),
                "checkpoint_id",
            ));
        }

        history.remove(idx);
        self.storage.save_history(&history).await?;
        *self.history.write().await = history;
        self.storage.delete(id).await?;

        tracing::info!("Deleted checkpoint {}", id);
        Ok(())
    }

    /// Content of `path` as of `timestamp`
    pub async fn read_at(&self, path: &str, timestamp: Millis) -> TidemarkResult<String> {
        self.timelines
            .read_at(&normalize_path(path), timestamp)
            .await
    }

    /// Preview restoring `path` to its content as of `timestamp`
    pub async fn preview_restore(
        &self,
        path: &str,
        timestamp: Millis,
    ) -> TidemarkResult<RestorePreview> {
        let path = normalize_path(path);
        let content = self.timelines.read_at(&path, timestamp).await?;
        Ok(preview_file_restore(self.host.as_ref(), &path, &content).await)
    }

    /// Restore `path` to its content as of `timestamp`
    ///
    /// The write is recorded as a `restored` event without evaluating the
    /// automatic checkpoint triggers. Returns the restored content.
    pub async fn restore(&self, path: &str, timestamp: Millis) -> TidemarkResult<String> {
        let path = normalize_path(path);
        self.with_file_lock(&path, || async {
            let content = self.timelines.read_at(&path, timestamp).await?;
            self.host.write_file(&path, &content).await?;

            let mut recorder = self.recorder.lock().await;
            let now = self.clock.now_millis();
            let event = ChangeEvent::new(
                path.clone(),
                0,
                content.clone(),
                ChangeAction::Restored,
                recorder.next_timestamp(&path, now),
            );
            let point = project(&event, &content);
            recorder.record(event, point, now)?;

            tracing::info!("Restored {} to its state at {}", path, timestamp);
            Ok::<_, TidemarkError>(content)
        })
        .await
    }

    /// Preview what restoring a checkpoint would write
    pub async fn preview_checkpoint_restore(
        &self,
        id: &CheckpointId,
    ) -> TidemarkResult<Vec<RestorePreview>> {
        let checkpoint = self.load_checkpoint_or_error(id).await?;
        let mut previews = Vec::new();
        for (path, file) in &checkpoint.files {
            previews.push(preview_file_restore(self.host.as_ref(), path, &file.snapshot).await);
        }
        Ok(previews)
    }

    /// Write every file of a checkpoint back from its stored snapshot
    pub async fn restore_checkpoint(
        &self,
        id: &CheckpointId,
        options: RestoreOptions,
    ) -> TidemarkResult<RestoreResult> {
        let checkpoint = self.load_checkpoint_or_error(id).await?;
        tracing::info!("Restoring to checkpoint {}", checkpoint.id);

        let mut result = RestoreResult::new(checkpoint.id.clone(), options.dry_run);
        for (path, file) in &checkpoint.files {
            if !options.includes(path) {
                continue;
            }
            if options.dry_run {
                result.restored_files.push(path.clone());
                continue;
            }

            let written = self
                .with_file_lock(path, || {
                    restore_file(self.host.as_ref(), path, &file.snapshot)
                })
                .await;
            match written {
                Ok(()) => result.restored_files.push(path.clone()),
                Err(reason) => {
                    tracing::warn!("Failed to restore {}: {}", path, reason);
                    result.failed_files.push((path.clone(), reason));
                }
            }
        }

        for path in &options.file_filter {
            if !checkpoint.files.contains_key(path) {
                result
                    .failed_files
                    .push((path.clone(), RestoreFailure::MissingContent));
            }
        }

        tracing::info!(
            "Restore complete: {} files restored, {} failed",
            result.restored_count(),
            result.failed_count()
        );
        Ok(result)
    }

    /// Timeline of `path`
    pub async fn get_timeline(&self, path: &str) -> TidemarkResult<Option<Timeline>> {
        self.timelines.get_timeline(&normalize_path(path)).await
    }

    /// Minimap of the changes to `path` since the last checkpoint, or of its latest checkpoint
    pub async fn get_minimap(&self, path: &str) -> TidemarkResult<Option<Minimap>> {
        let path = normalize_path(path);
        if let Some(minimap) = self.recorder.lock().await.minimap(&path) {
            return Ok(Some(minimap));
        }

        let latest = self
            .history
            .read()
            .await
            .iter()
            .rev()
            .find(|s| s.files.contains(&path))
            .map(|s| s.id.clone());
        let Some(id) = latest else {
            return Ok(None);
        };
        Ok(self
            .storage
            .load(&id)
            .await?
            .and_then(|mut checkpoint| checkpoint.files.remove(&path))
            .map(|file| file.minimap))
    }

    /// Downsample the closed buckets of one file's timeline
    pub async fn cleanup_snapshots(&self, path: &str) -> TidemarkResult<usize> {
        let path = normalize_path(path);
        let _recorder = self.recorder.lock().await;
        let timestamps = self.timelines.list_timestamps(&path).await?;
        let remove = plan_downsample(
            &timestamps,
            self.clock.now_millis(),
            self.config.settings.downsample_bucket_ms(),
            self.config.settings.downsample_sample_interval_ms(),
        );
        let removed = self.timelines.remove_snapshots(&path, &remove).await?;
        if removed > 0 {
            tracing::debug!("Downsampled {}: removed {} snapshots", path, removed);
        }
        Ok(removed)
    }

    /// Downsample every tracked file
    pub async fn cleanup_all(&self) -> TidemarkResult<usize> {
        let mut removed = 0;
        for path in self.timelines.tracked_files().await? {
            match self.cleanup_snapshots(&path).await {
                Ok(count) => removed += count,
                Err(e) => tracing::warn!("Failed to downsample {}: {}", path, e),
            }
        }
        tracing::info!("Snapshot cleanup removed {} snapshots", removed);
        Ok(removed)
    }

    /// Every checkpoint that captured `path`, oldest first
    pub async fn file_history(&self, path: &str) -> TidemarkResult<Vec<FileHistoryEntry>> {
        let path = normalize_path(path);
        let summaries: Vec<CheckpointSummary> = self
            .history
            .read()
            .await
            .iter()
            .filter(|s| s.files.contains(&path))
            .cloned()
            .collect();

        let mut entries = Vec::new();
        for summary in summaries {
            let Some(mut checkpoint) = self.storage.load(&summary.id).await? else {
                tracing::warn!("Checkpoint {} listed in history is missing", summary.id);
                continue;
            };
            if let Some(file) = checkpoint.files.remove(&path) {
                entries.push(FileHistoryEntry {
                    checkpoint_id: summary.id,
                    timestamp: summary.timestamp,
                    description: summary.description,
                    changes: file.changes,
                    snapshot: file.snapshot,
                });
            }
        }
        Ok(entries)
    }

    /// Snapshots of `path` between `from` and `to` inclusive
    pub async fn reconstruct_history(
        &self,
        path: &str,
        from: Millis,
        to: Millis,
    ) -> TidemarkResult<HistoryReconstruction> {
        if from > to {
            return Err(TidemarkError::invalid_input_field(
                format!("Range start {} is after its end {}", from, to),
                "from",
            ));
        }
        let path = normalize_path(path);
        let timeline = self.timelines.load(&path).await?;
        let initial_content = timeline
            .snapshot_at(from.saturating_sub(1))
            .map(|s| s.content.clone());
        let steps = timeline.slice(Some(from.saturating_sub(1)), to);
        let final_content = timeline.snapshot_at(to).map(|s| s.content.clone());

        Ok(HistoryReconstruction {
            file_path: path,
            initial_content,
            steps,
            final_content,
        })
    }

    /// Current engine state
    pub async fn status(&self) -> TidemarkResult<ManagerStatus> {
        let tracked_files = self.timelines.tracked_files().await?.len();
        let recorder = self.recorder.lock().await;
        let history = self.history.read().await;
        Ok(ManagerStatus {
            checkpoints: history.len(),
            has_initial_state: history.iter().any(|s| s.is_initial_state),
            open_batches: recorder.open_paths(),
            pending_files: recorder.pending().map(|(path, _)| path.clone()).collect(),
            events_since_checkpoint: recorder.events_since_checkpoint(),
            last_checkpoint_time: recorder.last_checkpoint_time(),
            tracked_files,
        })
    }
}
