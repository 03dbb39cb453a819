//! Change recording, flushing and checkpoint creation

use std::collections::{BTreeMap, BTreeSet};

use crate::clock::Millis;
use crate::error::TidemarkResult;
use crate::host::normalize_path;

use super::super::minimap::{LineProfile, project_with_profile};
use super::super::recorder::ChangeRecorder;
use super::super::retention::plan_eviction;
use super::super::scanner::WorkspaceScanner;
use super::super::types::{
    ChangeAction, ChangeEvent, Checkpoint, CheckpointFile, CheckpointId, CheckpointSummary,
    CheckpointTrigger, Minimap, Timeline,
};
use super::types::{CheckpointManager, RecordOutcome};

impl CheckpointManager {
    /// Record one edit
    ///
    /// Rejects events older than the last one recorded for the same file.
    /// Flushes the file's batch once its window has elapsed and builds an
    /// automatic checkpoint when a trigger fires.
    pub async fn record_change(&self, mut event: ChangeEvent) -> TidemarkResult<RecordOutcome> {
        event.file_path = normalize_path(&event.file_path);
        let path = event.file_path.clone();
        self.with_file_lock(&path, || self.record_locked(event, true))
            .await
    }

    /// Record several edits in order, stopping at the first rejected one
    pub async fn record_changes(
        &self,
        events: impl IntoIterator<Item = ChangeEvent>,
    ) -> TidemarkResult<Vec<RecordOutcome>> {
        let mut outcomes = Vec::new();
        for event in events {
            outcomes.push(self.record_change(event).await?);
        }
        Ok(outcomes)
    }

    /// Record a whole-file change observed on disk
    ///
    /// A readable file becomes a `modified` event carrying its full content;
    /// an unreadable one is recorded as `deleted`.
    pub async fn record_file_change(&self, path: &str) -> TidemarkResult<RecordOutcome> {
        let path = normalize_path(path);
        self.with_file_lock(&path, || self.record_file_locked(&path, true))
            .await
    }

    /// Force-flush the open batch of one file
    pub async fn flush_file(&self, path: &str) -> TidemarkResult<bool> {
        let path = normalize_path(path);
        self.with_file_lock(&path, || async {
            let mut recorder = self.recorder.lock().await;
            self.flush_locked(&mut recorder, &path).await
        })
        .await
    }

    /// Flush every batch whose window has elapsed, returning the flushed paths
    pub async fn flush_due(&self) -> TidemarkResult<Vec<String>> {
        let now = self.clock.now_millis();
        let mut recorder = self.recorder.lock().await;
        let mut flushed = Vec::new();
        for path in recorder.due_paths(now) {
            if self.flush_locked(&mut recorder, &path).await? {
                flushed.push(path);
            }
        }
        Ok(flushed)
    }

    /// Build an automatic checkpoint if a trigger is due
    pub async fn check_triggers(&self) -> TidemarkResult<Option<Checkpoint>> {
        let now = self.clock.now_millis();
        let mut recorder = self.recorder.lock().await;
        if !recorder.trigger_due(now) {
            return Ok(None);
        }
        self.build_locked(&mut recorder, CheckpointTrigger::Automatic, None)
            .await
    }

    /// Close every open batch into one checkpoint
    ///
    /// Returns `None` without writing anything when no change is pending.
    pub async fn build_checkpoint(
        &self,
        trigger: CheckpointTrigger,
        description: Option<String>,
    ) -> TidemarkResult<Option<Checkpoint>> {
        let mut recorder = self.recorder.lock().await;
        self.build_locked(&mut recorder, trigger, description).await
    }

    /// Capture every tracked file as the initial-state checkpoint
    ///
    /// Does nothing once any checkpoint exists.
    pub async fn ensure_initial_state(&self) -> TidemarkResult<Option<Checkpoint>> {
        let _recorder = self.recorder.lock().await;
        if !self.history.read().await.is_empty() {
            return Ok(None);
        }

        let now = self.clock.now_millis();
        let scanner = WorkspaceScanner::new(&self.config.project_root, self.filter.clone());
        let mut checkpoint = Checkpoint::initial_state(now);

        for path in scanner.scan().await? {
            match self.host.read_file(&path).await {
                Ok(content) => {
                    checkpoint.files.insert(
                        path.clone(),
                        CheckpointFile {
                            changes: Vec::new(),
                            snapshot: content,
                            timeline: Timeline::new(path.clone()),
                            minimap: Minimap::new(path, now),
                        },
                    );
                }
                Err(e) => tracing::warn!("Skipping {} in initial state: {}", path, e),
            }
        }

        self.storage.save(&checkpoint).await?;
        let history = vec![CheckpointSummary::from(&checkpoint)];
        self.storage.save_history(&history).await?;
        *self.history.write().await = history;

        tracing::info!(
            "Created initial state with {} files",
            checkpoint.file_count()
        );
        Ok(Some(checkpoint))
    }

    /// Record every file whose content differs from what the engine last saw
    ///
    /// New and modified files become `modified` events and tracked files
    /// missing from disk become `deleted` ones. No automatic checkpoint is
    /// built while syncing, so a caller that builds afterwards gets every
    /// synced file in one checkpoint. Returns the recorded paths.
    pub async fn sync_workspace(&self) -> TidemarkResult<Vec<String>> {
        let scanner = WorkspaceScanner::new(&self.config.project_root, self.filter.clone());
        let baseline = self.initial_state_snapshots().await?;

        let mut candidates: BTreeSet<String> = scanner.scan().await?.into_iter().collect();
        candidates.extend(self.timelines.tracked_files().await?);
        candidates.extend(baseline.keys().cloned());

        let mut recorded = Vec::new();
        for path in candidates {
            if self.filter.is_ignored(&path) {
                continue;
            }
            let current = self.host.read_file(&path).await.ok();
            let known = self.last_known_content(&path, &baseline).await?;
            if current != known {
                self.with_file_lock(&path, || self.record_file_locked(&path, false))
                    .await?;
                recorded.push(path);
            }
        }

        tracing::debug!("Workspace sync recorded {} files", recorded.len());
        Ok(recorded)
    }

    // Internal helper methods

    /// Record `event`; the caller holds the file's lock
    async fn record_locked(
        &self,
        event: ChangeEvent,
        evaluate_triggers: bool,
    ) -> TidemarkResult<RecordOutcome> {
        let path = event.file_path.clone();
        self.recorder.lock().await.check_order(&event)?;
        let profile = self.profile_line(&path, event.line_number).await;
        let point = project_with_profile(&event, profile);

        let now = self.clock.now_millis();
        let mut recorder = self.recorder.lock().await;
        recorder.record(event, point, now)?;

        let mut outcome = RecordOutcome::default();
        if recorder.is_due(&path, now) {
            match self.flush_locked(&mut recorder, &path).await {
                Ok(flushed) => outcome.flushed = flushed,
                Err(e) => tracing::warn!("Failed to flush {}: {}", path, e),
            }
        }
        if evaluate_triggers && recorder.trigger_due(now) {
            match self
                .build_locked(&mut recorder, CheckpointTrigger::Automatic, None)
                .await
            {
                Ok(checkpoint) => outcome.checkpoint = checkpoint,
                Err(e) => tracing::warn!("Automatic checkpoint failed: {}", e),
            }
        }
        Ok(outcome)
    }

    /// Read `path` and record it whole; the caller holds the file's lock
    async fn record_file_locked(
        &self,
        path: &str,
        evaluate_triggers: bool,
    ) -> TidemarkResult<RecordOutcome> {
        let (content, action) = match self.host.read_file(path).await {
            Ok(content) => (content, ChangeAction::Modified),
            Err(e) => {
                tracing::debug!("Recording {} as deleted: {}", path, e);
                (String::new(), ChangeAction::Deleted)
            }
        };
        let now = self.clock.now_millis();
        let timestamp = self.recorder.lock().await.next_timestamp(path, now);
        let event = ChangeEvent::new(path, 0, content, action, timestamp);
        self.record_locked(event, evaluate_triggers).await
    }

    async fn initial_state_snapshots(&self) -> TidemarkResult<BTreeMap<String, String>> {
        let initial = self
            .history
            .read()
            .await
            .iter()
            .find(|s| s.is_initial_state)
            .map(|s| s.id.clone());
        let Some(id) = initial else {
            return Ok(BTreeMap::new());
        };
        Ok(self
            .storage
            .load(&id)
            .await?
            .map(|checkpoint| {
                checkpoint
                    .files
                    .into_iter()
                    .map(|(path, file)| (path, file.snapshot))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Content the engine last recorded for `path`, `None` once it was deleted
    async fn last_known_content(
        &self,
        path: &str,
        baseline: &BTreeMap<String, String>,
    ) -> TidemarkResult<Option<String>> {
        let timeline = self.timelines.load(path).await?;
        if timeline
            .changes
            .last()
            .is_some_and(|c| c.action == ChangeAction::Deleted)
        {
            return Ok(None);
        }
        Ok(match timeline.last_snapshot() {
            Some(snapshot) => Some(snapshot.content.clone()),
            None => baseline.get(path).cloned(),
        })
    }

    async fn profile_line(&self, path: &str, line_number: usize) -> LineProfile {
        match self.host.line_profile(path, line_number).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::debug!("Projecting {} against empty content: {}", path, e);
                LineProfile::default()
            }
        }
    }

    /// Append a file's batch to its timeline; the batch stays pending for the next checkpoint
    pub(super) async fn flush_locked(
        &self,
        recorder: &mut ChangeRecorder,
        path: &str,
    ) -> TidemarkResult<bool> {
        let Some(batch) = recorder.take_batch(path) else {
            return Ok(false);
        };

        let result = match (batch.last_timestamp(), self.host.read_file(path).await) {
            (Some(timestamp), Ok(content)) => self
                .timelines
                .append_flush(path, &batch.changes, timestamp, &content)
                .await
                .map(|_| ()),
            (_, Err(e)) => {
                tracing::warn!("Flushing {} without a snapshot: {}", path, e);
                self.timelines.append_changes(path, &batch.changes).await
            }
            (None, Ok(_)) => Ok(()),
        };

        match result {
            Ok(()) => {
                tracing::debug!("Flushed {} events for {}", batch.changes.len(), path);
                recorder.commit_flushed(batch);
                Ok(true)
            }
            Err(e) => {
                recorder.restore_batch(batch);
                Err(e)
            }
        }
    }

    pub(super) async fn build_locked(
        &self,
        recorder: &mut ChangeRecorder,
        trigger: CheckpointTrigger,
        description: Option<String>,
    ) -> TidemarkResult<Option<Checkpoint>> {
        for path in recorder.open_paths() {
            if let Err(e) = self.flush_locked(recorder, &path).await {
                tracing::warn!("Failed to flush {} before checkpoint: {}", path, e);
            }
        }

        let pending: Vec<_> = recorder
            .pending()
            .map(|(path, file)| (path.clone(), file.clone()))
            .collect();
        if pending.is_empty() {
            tracing::debug!("No pending changes, skipping {} checkpoint", trigger);
            return Ok(None);
        }

        let history = self.history.read().await.clone();
        let now = self.clock.now_millis();
        let timestamp = history
            .last()
            .map_or(now, |last| now.max(last.timestamp + 1));
        let mut checkpoint = Checkpoint::new(timestamp, trigger, description);
        checkpoint.metadata.is_initial_state = history.is_empty();

        for (path, file) in pending {
            let snapshot = match self.host.read_file(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Skipping {} in checkpoint: {}", path, e);
                    continue;
                }
            };
            let timeline = match self.timelines.load(&path).await {
                Ok(timeline) => timeline.slice(since(file.first_timestamp()), Millis::MAX),
                Err(e) => {
                    tracing::warn!("Checkpointing {} without its timeline: {}", path, e);
                    Timeline::new(path.clone())
                }
            };
            checkpoint.files.insert(
                path,
                CheckpointFile {
                    changes: file.changes,
                    snapshot,
                    timeline,
                    minimap: file.minimap,
                },
            );
        }

        if checkpoint.files.is_empty() {
            tracing::warn!("No pending file could be read, dropping pending changes");
            recorder.discard_pending();
            return Ok(None);
        }

        self.storage.save(&checkpoint).await?;

        let mut updated = history;
        updated.push(CheckpointSummary::from(&checkpoint));
        let evicted = plan_eviction(&updated, self.config.settings.max_checkpoints);
        let evicted_initial = updated
            .iter()
            .find(|s| s.is_initial_state && evicted.contains(&s.id))
            .map(|s| s.id.clone());
        updated.retain(|s| !evicted.contains(&s.id));

        if let Err(e) = self.storage.save_history(&updated).await {
            if let Err(cleanup) = self.storage.delete(&checkpoint.id).await {
                tracing::warn!("Failed to remove unlisted checkpoint {}: {}", checkpoint.id, cleanup);
            }
            return Err(e);
        }
        *self.history.write().await = updated;
        recorder.mark_checkpointed(timestamp);

        if let Some(id) = &evicted_initial {
            self.carry_forward_baseline(id).await;
        }
        for id in &evicted {
            if let Err(e) = self.storage.delete(id).await {
                tracing::warn!("Failed to delete evicted checkpoint {}: {}", id, e);
            }
        }

        tracing::info!(
            "Created {} checkpoint {} with {} files ({} evicted)",
            trigger,
            checkpoint.id,
            checkpoint.file_count(),
            evicted.len()
        );
        Ok(Some(checkpoint))
    }

    /// Seed untouched files' timelines from an initial state about to be evicted
    ///
    /// Files never recorded since activation have no timeline, so the
    /// initial state is the only record of their content.
    async fn carry_forward_baseline(&self, id: &CheckpointId) {
        let checkpoint = match self.storage.load(id).await {
            Ok(Some(checkpoint)) => checkpoint,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to load evicted initial state {}: {}", id, e);
                return;
            }
        };

        let mut seeded = 0;
        for (path, file) in &checkpoint.files {
            let result = match self.timelines.get_timeline(path).await {
                Ok(None) => self
                    .timelines
                    .append_snapshot(path, checkpoint.timestamp, &file.snapshot)
                    .await,
                Ok(Some(_)) => Ok(false),
                Err(e) => Err(e),
            };
            match result {
                Ok(true) => seeded += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to seed timeline of {}: {}", path, e),
            }
        }
        tracing::debug!(
            "Carried {} files forward from evicted initial state {}",
            seeded,
            id
        );
    }
}

/// Lower bound of the timeline slice covering pending events from `first`
fn since(first: Option<Millis>) -> Option<Millis> {
    first.map(|ts| ts - 1)
}
