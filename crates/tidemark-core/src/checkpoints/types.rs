//! Checkpoint type definitions
//!
//! Records are closed sets of tagged variants (change action, minimap kind)
//! so every consumer matches them exhaustively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::{Millis, format_millis};

/// Id prefix for checkpoints created by the builder
pub const CHECKPOINT_ID_PREFIX: &str = "checkpoint_";

/// Id of the workspace's initial-state checkpoint
pub const INITIAL_STATE_ID: &str = "initial_state";

/// Unique identifier for a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(pub String);

impl CheckpointId {
    /// Id derived from the checkpoint's creation timestamp
    pub fn from_timestamp(timestamp: Millis) -> Self {
        Self(format!("{}{}", CHECKPOINT_ID_PREFIX, timestamp))
    }

    /// Id of the initial-state checkpoint
    pub fn initial_state() -> Self {
        Self(INITIAL_STATE_ID.to_string())
    }

    /// Create from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is the initial-state id
    pub fn is_initial_state(&self) -> bool {
        self.0 == INITIAL_STATE_ID
    }
}

impl std::fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classified kind of an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Modified,
    Deleted,
    Restored,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Restored => write!(f, "restored"),
        }
    }
}

/// A normalized edit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Workspace-relative path of the edited file
    pub file_path: String,
    /// Zero-based line the edit starts on
    pub line_number: usize,
    /// New text
    pub content: String,
    /// Classified action
    pub action: ChangeAction,
    /// When the edit happened
    pub timestamp: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_line_number: Option<usize>,
}

impl ChangeEvent {
    /// Create a new change event
    pub fn new(
        file_path: impl Into<String>,
        line_number: usize,
        content: impl Into<String>,
        action: ChangeAction,
        timestamp: Millis,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            content: content.into(),
            action,
            timestamp,
            previous_content: None,
            previous_line_number: None,
        }
    }

    /// Attach the text and line this edit replaced
    pub fn with_previous(mut self, content: impl Into<String>, line_number: usize) -> Self {
        self.previous_content = Some(content.into());
        self.previous_line_number = Some(line_number);
        self
    }
}

/// Visual kind of a minimap point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimapKind {
    Add,
    Delete,
    Modify,
}

impl From<ChangeAction> for MinimapKind {
    fn from(action: ChangeAction) -> Self {
        match action {
            ChangeAction::Added => Self::Add,
            ChangeAction::Deleted => Self::Delete,
            ChangeAction::Modified | ChangeAction::Restored => Self::Modify,
        }
    }
}

/// A 2-D projection of one edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimapPoint {
    /// Indentation position, 0..=100
    pub x: u8,
    /// Vertical position in the file, 0..=100
    pub y: u8,
    pub kind: MinimapKind,
    pub timestamp: Millis,
    pub line_number: usize,
}

/// Width and height of the minimap canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimapDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for MinimapDimensions {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
        }
    }
}

/// Accumulated minimap points for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minimap {
    pub file_path: String,
    pub points: Vec<MinimapPoint>,
    pub start_time: Millis,
    pub end_time: Millis,
    #[serde(default)]
    pub dimensions: MinimapDimensions,
}

impl Minimap {
    /// Create an empty minimap starting at `start_time`
    pub fn new(file_path: impl Into<String>, start_time: Millis) -> Self {
        Self {
            file_path: file_path.into(),
            points: Vec::new(),
            start_time,
            end_time: start_time,
            dimensions: MinimapDimensions::default(),
        }
    }

    /// Add a point, extending the time span
    pub fn push(&mut self, point: MinimapPoint) {
        self.end_time = self.end_time.max(point.timestamp);
        self.points.push(point);
    }

    /// Append another minimap's points
    pub fn extend(&mut self, other: Minimap) {
        self.start_time = self.start_time.min(other.start_time);
        for point in other.points {
            self.push(point);
        }
        self.end_time = self.end_time.max(other.end_time);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The open modification batch of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeBatch {
    pub file_path: String,
    pub start_time: Millis,
    pub changes: Vec<ChangeEvent>,
    pub minimap: Minimap,
}

impl FileChangeBatch {
    /// Open a new batch at `start_time`
    pub fn new(file_path: impl Into<String>, start_time: Millis) -> Self {
        let file_path = file_path.into();
        Self {
            minimap: Minimap::new(file_path.clone(), start_time),
            file_path,
            start_time,
            changes: Vec::new(),
        }
    }

    /// Timestamp of the newest event, if any
    pub fn last_timestamp(&self) -> Option<Millis> {
        self.changes.last().map(|c| c.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A full-content capture of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub timestamp: Millis,
    pub content: String,
}

/// Append-only history of one file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub file_path: String,
    #[serde(default)]
    pub changes: Vec<ChangeEvent>,
    #[serde(default)]
    pub snapshots: Vec<SnapshotEntry>,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            changes: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    /// Newest snapshot, if any
    pub fn last_snapshot(&self) -> Option<&SnapshotEntry> {
        self.snapshots.last()
    }

    /// Snapshot with the greatest timestamp at or before `timestamp`
    pub fn snapshot_at(&self, timestamp: Millis) -> Option<&SnapshotEntry> {
        let idx = self.snapshots.partition_point(|s| s.timestamp <= timestamp);
        idx.checked_sub(1).map(|i| &self.snapshots[i])
    }

    /// Ordered snapshot timestamps
    pub fn timestamps(&self) -> Vec<Millis> {
        self.snapshots.iter().map(|s| s.timestamp).collect()
    }

    /// Events and snapshots in the half-open window `(after, until]`
    pub fn slice(&self, after: Option<Millis>, until: Millis) -> Timeline {
        let in_window = |ts: Millis| after.is_none_or(|a| ts > a) && ts <= until;
        Timeline {
            file_path: self.file_path.clone(),
            changes: self
                .changes
                .iter()
                .filter(|c| in_window(c.timestamp))
                .cloned()
                .collect(),
            snapshots: self
                .snapshots
                .iter()
                .filter(|s| in_window(s.timestamp))
                .cloned()
                .collect(),
        }
    }
}

/// How a checkpoint build was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointTrigger {
    Manual,
    Automatic,
}

impl CheckpointTrigger {
    pub fn is_automatic(self) -> bool {
        matches!(self, Self::Automatic)
    }
}

impl std::fmt::Display for CheckpointTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Automatic => write!(f, "automatic"),
        }
    }
}

/// Everything a checkpoint records for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointFile {
    /// Events pending for this file when the checkpoint was built
    pub changes: Vec<ChangeEvent>,
    /// Full content at build time
    pub snapshot: String,
    /// Timeline entries recorded since the previous checkpoint
    pub timeline: Timeline,
    pub minimap: Minimap,
}

/// Descriptive checkpoint metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub description: String,
    pub is_automatic: bool,
    #[serde(default)]
    pub is_initial_state: bool,
}

/// An immutable, restorable capture of every file touched since the previous checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub timestamp: Millis,
    pub files: BTreeMap<String, CheckpointFile>,
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    /// Create an empty checkpoint for `trigger`
    pub fn new(
        timestamp: Millis,
        trigger: CheckpointTrigger,
        description: Option<String>,
    ) -> Self {
        let description = description.unwrap_or_else(|| {
            format!("{} checkpoint - {}", capitalize(&trigger.to_string()), format_millis(timestamp))
        });
        Self {
            id: CheckpointId::from_timestamp(timestamp),
            timestamp,
            files: BTreeMap::new(),
            metadata: CheckpointMetadata {
                description,
                is_automatic: trigger.is_automatic(),
                is_initial_state: false,
            },
        }
    }

    /// Create the initial-state checkpoint
    pub fn initial_state(timestamp: Millis) -> Self {
        Self {
            id: CheckpointId::initial_state(),
            timestamp,
            files: BTreeMap::new(),
            metadata: CheckpointMetadata {
                description: "Initial project state".to_string(),
                is_automatic: true,
                is_initial_state: true,
            },
        }
    }

    /// Get file count
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of recorded events across files
    pub fn change_count(&self) -> usize {
        self.files.values().map(|f| f.changes.len()).sum()
    }

    pub fn is_initial_state(&self) -> bool {
        self.metadata.is_initial_state
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Summary of a checkpoint, as kept in the history document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub id: CheckpointId,
    pub timestamp: Millis,
    pub description: String,
    pub is_automatic: bool,
    #[serde(default)]
    pub is_initial_state: bool,
    pub file_count: usize,
    pub change_count: usize,
    #[serde(default)]
    pub files: Vec<String>,
}

impl From<&Checkpoint> for CheckpointSummary {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            id: checkpoint.id.clone(),
            timestamp: checkpoint.timestamp,
            description: checkpoint.metadata.description.clone(),
            is_automatic: checkpoint.metadata.is_automatic,
            is_initial_state: checkpoint.metadata.is_initial_state,
            file_count: checkpoint.file_count(),
            change_count: checkpoint.change_count(),
            files: checkpoint.files.keys().cloned().collect(),
        }
    }
}

/// Per-file reason a restore failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreFailure {
    /// The checkpoint or timeline has no content for the file
    MissingContent,
    /// Writing the live file failed
    WriteFailed(String),
    /// Reading persisted history failed
    StorageError(String),
}

impl std::fmt::Display for RestoreFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContent => write!(f, "no stored content for file"),
            Self::WriteFailed(e) => write!(f, "failed to write file: {}", e),
            Self::StorageError(e) => write!(f, "storage error: {}", e),
        }
    }
}

/// Restore options
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Specific files to restore (empty = all)
    pub file_filter: Vec<String>,
    /// Report what would be restored without writing
    pub dry_run: bool,
}

impl RestoreOptions {
    /// Restore every file
    pub fn all() -> Self {
        Self::default()
    }

    /// Create dry run options
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Add file filter
    pub fn with_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.file_filter.extend(files.into_iter().map(Into::into));
        self
    }

    pub(crate) fn includes(&self, path: &str) -> bool {
        self.file_filter.is_empty() || self.file_filter.iter().any(|f| f == path)
    }
}

/// Result of restoring a checkpoint
#[derive(Debug, Clone)]
pub struct RestoreResult {
    /// Checkpoint that was restored
    pub checkpoint_id: CheckpointId,
    /// Files that were restored
    pub restored_files: Vec<String>,
    /// Files that failed to restore
    pub failed_files: Vec<(String, RestoreFailure)>,
    /// Was this a dry run
    pub was_dry_run: bool,
}

impl RestoreResult {
    pub(crate) fn new(checkpoint_id: CheckpointId, was_dry_run: bool) -> Self {
        Self {
            checkpoint_id,
            restored_files: Vec::new(),
            failed_files: Vec::new(),
            was_dry_run,
        }
    }

    /// Check if restore was successful
    pub fn is_success(&self) -> bool {
        self.failed_files.is_empty()
    }

    /// Get count of restored files
    pub fn restored_count(&self) -> usize {
        self.restored_files.len()
    }

    /// Get count of failed files
    pub fn failed_count(&self) -> usize {
        self.failed_files.len()
    }
}
