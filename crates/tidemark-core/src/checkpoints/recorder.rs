//! Change recorder
//!
//! Owns the open batch of every file plus the per-file changes accumulated
//! since the last checkpoint. Flushing a batch makes it durable in the
//! timeline but keeps its events pending, so the next checkpoint still
//! captures them.

use std::collections::{BTreeMap, HashMap};

use super::types::{ChangeEvent, FileChangeBatch, Minimap, MinimapPoint};
use crate::clock::Millis;
use crate::error::{TidemarkError, TidemarkResult};

/// Changes to one file accumulated since the previous checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub changes: Vec<ChangeEvent>,
    pub minimap: Minimap,
}

impl PendingFile {
    fn from_batch(batch: FileChangeBatch) -> Self {
        Self {
            changes: batch.changes,
            minimap: batch.minimap,
        }
    }

    fn absorb(&mut self, batch: FileChangeBatch) {
        self.changes.extend(batch.changes);
        self.minimap.extend(batch.minimap);
    }

    /// Timestamp of the oldest pending event
    pub fn first_timestamp(&self) -> Option<Millis> {
        self.changes.first().map(|c| c.timestamp)
    }
}

/// Thresholds the recorder evaluates on every edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderPolicy {
    pub flush_window_ms: Millis,
    pub checkpoint_interval_ms: Millis,
    pub edit_threshold: usize,
}

/// Per-file batch map and automatic-checkpoint bookkeeping
#[derive(Debug)]
pub struct ChangeRecorder {
    policy: RecorderPolicy,
    batches: HashMap<String, FileChangeBatch>,
    pending: BTreeMap<String, PendingFile>,
    last_event: HashMap<String, Millis>,
    events_since_checkpoint: usize,
    last_checkpoint_time: Millis,
}

impl ChangeRecorder {
    /// Create an empty recorder whose last checkpoint happened at `last_checkpoint_time`
    pub fn new(policy: RecorderPolicy, last_checkpoint_time: Millis) -> Self {
        Self {
            policy,
            batches: HashMap::new(),
            pending: BTreeMap::new(),
            last_event: HashMap::new(),
            events_since_checkpoint: 0,
            last_checkpoint_time,
        }
    }

    /// Reject events older than the newest one recorded for the same file
    pub fn check_order(&self, event: &ChangeEvent) -> TidemarkResult<()> {
        match self.last_event.get(&event.file_path) {
            Some(last) if event.timestamp < *last => Err(TidemarkError::invalid_input_field(
                format!(
                    "Event for {} at {} is older than the last recorded event at {}",
                    event.file_path, event.timestamp, last
                ),
                "timestamp",
            )),
            _ => Ok(()),
        }
    }

    /// Earliest timestamp at or after `now` that `path` accepts
    pub fn next_timestamp(&self, path: &str, now: Millis) -> Millis {
        self.last_event
            .get(path)
            .map_or(now, |last| now.max(*last))
    }

    /// Append `event` and its projected point to the file's open batch
    pub fn record(
        &mut self,
        event: ChangeEvent,
        point: MinimapPoint,
        now: Millis,
    ) -> TidemarkResult<()> {
        self.check_order(&event)?;

        let batch = self
            .batches
            .entry(event.file_path.clone())
            .or_insert_with(|| FileChangeBatch::new(event.file_path.clone(), now));
        self.last_event.insert(event.file_path.clone(), event.timestamp);
        batch.minimap.push(point);
        batch.changes.push(event);
        self.events_since_checkpoint += 1;
        Ok(())
    }

    /// Whether `batch` should be flushed at `now`
    pub fn should_flush(&self, batch: &FileChangeBatch, force: bool, now: Millis) -> bool {
        force || now - batch.start_time > self.policy.flush_window_ms
    }

    /// Whether the open batch of `path` is due at `now`
    pub fn is_due(&self, path: &str, now: Millis) -> bool {
        self.batches
            .get(path)
            .is_some_and(|batch| self.should_flush(batch, false, now))
    }

    /// Paths whose open batch is due at `now`
    pub fn due_paths(&self, now: Millis) -> Vec<String> {
        let mut paths: Vec<String> = self
            .batches
            .iter()
            .filter(|(_, batch)| self.should_flush(batch, false, now))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Paths with an open batch
    pub fn open_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.batches.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Detach the open batch of `path` for flushing
    pub fn take_batch(&mut self, path: &str) -> Option<FileChangeBatch> {
        self.batches.remove(path).filter(|batch| !batch.is_empty())
    }

    /// Move a flushed batch into the pending set
    pub fn commit_flushed(&mut self, batch: FileChangeBatch) {
        match self.pending.get_mut(&batch.file_path) {
            Some(pending) => pending.absorb(batch),
            None => {
                self.pending
                    .insert(batch.file_path.clone(), PendingFile::from_batch(batch));
            }
        }
    }

    /// Put back a batch whose flush failed, ahead of anything recorded since
    pub fn restore_batch(&mut self, mut batch: FileChangeBatch) {
        if let Some(newer) = self.batches.remove(&batch.file_path) {
            batch.changes.extend(newer.changes);
            batch.minimap.extend(newer.minimap);
        }
        self.batches.insert(batch.file_path.clone(), batch);
    }

    /// Whether any open batch or pending entry holds a change
    pub fn has_pending(&self) -> bool {
        self.batches.values().any(|b| !b.is_empty())
            || self.pending.values().any(|p| !p.changes.is_empty())
    }

    /// Whether an automatic checkpoint is due at `now`
    pub fn trigger_due(&self, now: Millis) -> bool {
        let interval_elapsed = now - self.last_checkpoint_time > self.policy.checkpoint_interval_ms
            && self.has_pending();
        let threshold_reached = self.events_since_checkpoint >= self.policy.edit_threshold;
        interval_elapsed || threshold_reached
    }

    /// Pending entries with at least one change
    pub fn pending(&self) -> impl Iterator<Item = (&String, &PendingFile)> {
        self.pending.iter().filter(|(_, p)| !p.changes.is_empty())
    }

    /// Pending and open-batch minimap points of `path`
    pub fn minimap(&self, path: &str) -> Option<Minimap> {
        let pending = self.pending.get(path).map(|p| p.minimap.clone());
        let open = self.batches.get(path).map(|b| b.minimap.clone());
        match (pending, open) {
            (Some(mut pending), Some(open)) => {
                pending.extend(open);
                Some(pending)
            }
            (pending, open) => pending.or(open),
        }
    }

    /// Number of events recorded since the last checkpoint
    pub fn events_since_checkpoint(&self) -> usize {
        self.events_since_checkpoint
    }

    /// Time of the last checkpoint
    pub fn last_checkpoint_time(&self) -> Millis {
        self.last_checkpoint_time
    }

    /// Forget everything a checkpoint at `timestamp` captured
    pub fn mark_checkpointed(&mut self, timestamp: Millis) {
        self.discard_pending();
        self.last_checkpoint_time = timestamp;
    }

    /// Drop pending changes that can no longer be captured
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.events_since_checkpoint = 0;
    }
}
