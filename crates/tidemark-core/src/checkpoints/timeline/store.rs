//! File-backed timeline store

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::encoding::{decode_path, encode_path};
use crate::checkpoints::types::{ChangeEvent, SnapshotEntry, Timeline};
use crate::clock::Millis;
use crate::error::{TidemarkError, TidemarkResult};
use crate::persist::{self, Loaded};

const TIMELINE_FILE: &str = "timeline.json";

/// Timelines kept in memory by default
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

fn stale_snapshot(file_path: &str, timestamp: Millis, last: Millis) -> TidemarkError {
    TidemarkError::invalid_input_field(
        format!(
            "Snapshot for {} at {} is not newer than the last snapshot at {}",
            file_path, timestamp, last
        ),
        "timestamp",
    )
}

/// Durable per-file timelines
///
/// Stores one document per file:
/// ```text
/// base_path/
///   timelines/
///     {percent_encoded_path}/
///       timeline.json
/// ```
///
/// Writes for one file must be serialized by the caller; the engine does so
/// with its per-file locks. The most recently used timelines are cached up
/// to a fixed capacity; the rest are read back from disk.
pub struct TimelineStore {
    base_path: PathBuf,
    cache: Mutex<LruCache<String, Timeline>>,
}

impl TimelineStore {
    /// Create a store under `storage_path/timelines`
    pub fn new(storage_path: impl AsRef<Path>) -> Self {
        Self::with_cache_capacity(storage_path, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a store caching at most `capacity` timelines
    pub fn with_cache_capacity(storage_path: impl AsRef<Path>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            base_path: storage_path.as_ref().join("timelines"),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of timelines currently cached
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    fn timeline_path(&self, file_path: &str) -> PathBuf {
        self.base_path
            .join(encode_path(file_path))
            .join(TIMELINE_FILE)
    }

    /// Load the timeline of `file_path`, empty when missing or corrupt
    pub async fn load(&self, file_path: &str) -> TidemarkResult<Timeline> {
        let cached = self.cache.lock().get(file_path).cloned();
        if let Some(timeline) = cached {
            return Ok(timeline);
        }

        let path = self.timeline_path(file_path);
        let timeline = match persist::read_json::<Timeline>(&path).await? {
            Loaded::Found(timeline) => timeline,
            Loaded::Missing => Timeline::new(file_path),
            Loaded::Corrupt(reason) => {
                tracing::warn!(
                    "Timeline for {} is corrupt, treating as empty: {}",
                    file_path,
                    reason
                );
                Timeline::new(file_path)
            }
        };

        self.cache
            .lock()
            .put(file_path.to_string(), timeline.clone());
        Ok(timeline)
    }

    async fn persist(&self, timeline: Timeline) -> TidemarkResult<()> {
        let path = self.timeline_path(&timeline.file_path);
        persist::write_json(&path, &timeline).await?;
        self.cache.lock().put(timeline.file_path.clone(), timeline);
        Ok(())
    }

    /// Check `timestamp` and `content` against the newest snapshot
    ///
    /// Returns `Ok(false)` when the content is unchanged and nothing should be written.
    fn accepts_snapshot(
        timeline: &Timeline,
        timestamp: Millis,
        content: &str,
    ) -> TidemarkResult<bool> {
        let Some(last) = timeline.last_snapshot() else {
            return Ok(true);
        };
        if timestamp < last.timestamp {
            return Err(stale_snapshot(&timeline.file_path, timestamp, last.timestamp));
        }
        if last.content == content {
            return Ok(false);
        }
        if timestamp == last.timestamp {
            return Err(stale_snapshot(&timeline.file_path, timestamp, last.timestamp));
        }
        Ok(true)
    }

    /// Append a full-content snapshot
    ///
    /// Returns `false` without writing when `content` equals the newest snapshot.
    pub async fn append_snapshot(
        &self,
        file_path: &str,
        timestamp: Millis,
        content: &str,
    ) -> TidemarkResult<bool> {
        let mut timeline = self.load(file_path).await?;
        if !Self::accepts_snapshot(&timeline, timestamp, content)? {
            return Ok(false);
        }
        timeline.snapshots.push(SnapshotEntry {
            timestamp,
            content: content.to_string(),
        });
        self.persist(timeline).await?;
        tracing::debug!("Appended snapshot for {} at {}", file_path, timestamp);
        Ok(true)
    }

    /// Append change events
    pub async fn append_changes(
        &self,
        file_path: &str,
        events: &[ChangeEvent],
    ) -> TidemarkResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut timeline = self.load(file_path).await?;
        timeline.changes.extend_from_slice(events);
        self.persist(timeline).await
    }

    /// Append events and a snapshot in a single write
    ///
    /// A snapshot whose timestamp collides with or precedes the newest one is
    /// stamped one millisecond after it. Unchanged content adds no snapshot.
    /// Returns whether a snapshot was added.
    pub async fn append_flush(
        &self,
        file_path: &str,
        events: &[ChangeEvent],
        timestamp: Millis,
        content: &str,
    ) -> TidemarkResult<bool> {
        let mut timeline = self.load(file_path).await?;
        let timestamp = match timeline.last_snapshot() {
            Some(last) if last.content != content => timestamp.max(last.timestamp + 1),
            _ => timestamp,
        };
        let add_snapshot = timeline
            .last_snapshot()
            .is_none_or(|last| last.content != content);
        if events.is_empty() && !add_snapshot {
            return Ok(false);
        }

        timeline.changes.extend_from_slice(events);
        if add_snapshot {
            timeline.snapshots.push(SnapshotEntry {
                timestamp,
                content: content.to_string(),
            });
        }
        self.persist(timeline).await?;
        tracing::debug!(
            "Flushed {} events for {} (snapshot: {})",
            events.len(),
            file_path,
            add_snapshot
        );
        Ok(add_snapshot)
    }

    /// Content of the newest snapshot at or before `timestamp`
    pub async fn read_at(&self, file_path: &str, timestamp: Millis) -> TidemarkResult<String> {
        let timeline = self.load(file_path).await?;
        timeline
            .snapshot_at(timestamp)
            .map(|s| s.content.clone())
            .ok_or_else(|| {
                TidemarkError::not_found_resource(
                    format!("No snapshot of {} at or before {}", file_path, timestamp),
                    "snapshot",
                )
            })
    }

    /// Ordered snapshot timestamps
    pub async fn list_timestamps(&self, file_path: &str) -> TidemarkResult<Vec<Millis>> {
        Ok(self.load(file_path).await?.timestamps())
    }

    /// Delete the snapshots with the given timestamps, returning how many were removed
    pub async fn remove_snapshots(
        &self,
        file_path: &str,
        timestamps: &[Millis],
    ) -> TidemarkResult<usize> {
        if timestamps.is_empty() {
            return Ok(0);
        }
        let mut timeline = self.load(file_path).await?;
        let before = timeline.snapshots.len();
        timeline
            .snapshots
            .retain(|s| !timestamps.contains(&s.timestamp));
        let removed = before - timeline.snapshots.len();
        if removed > 0 {
            self.persist(timeline).await?;
        }
        Ok(removed)
    }

    /// Timeline of `file_path`, `None` when nothing was ever recorded
    pub async fn get_timeline(&self, file_path: &str) -> TidemarkResult<Option<Timeline>> {
        let timeline = self.load(file_path).await?;
        if timeline.changes.is_empty() && timeline.snapshots.is_empty() {
            Ok(None)
        } else {
            Ok(Some(timeline))
        }
    }

    /// Every file with a timeline on disk
    pub async fn tracked_files(&self) -> TidemarkResult<Vec<String>> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => {
                return Err(TidemarkError::storage(format!(
                    "Failed to read timelines directory: {}",
                    e
                )));
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TidemarkError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            match decode_path(&name) {
                Some(path) if entry.path().join(TIMELINE_FILE).exists() => files.push(path),
                Some(_) => {}
                None => tracing::warn!("Skipping unrecognized timeline directory {}", name),
            }
        }

        files.sort();
        Ok(files)
    }
}
