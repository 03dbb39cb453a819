//! Workspace change detection via file system watching
//!
//! Debounced filesystem notifications become whole-file change events for
//! the checkpoint manager.

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::scanner::PathFilter;
use crate::error::{TidemarkError, TidemarkResult};
use crate::host::normalize_path;

/// A tracked file changed on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceChange {
    /// Workspace-relative path
    pub path: String,
}

/// Debounced watcher over a workspace root
pub struct WorkspaceWatcher {
    /// Debounced file watcher
    #[allow(dead_code)]
    debouncer: Debouncer<RecommendedWatcher>,
    /// Channel for receiving change events
    event_rx: mpsc::UnboundedReceiver<WorkspaceChange>,
    root: PathBuf,
}

impl WorkspaceWatcher {
    /// Start watching `root` recursively
    pub fn new(root: &Path, filter: PathFilter, debounce: Duration) -> TidemarkResult<Self> {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watch_root = root.clone();
        let mut debouncer = new_debouncer(
            debounce,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    for event in events {
                        if !matches!(event.kind, DebouncedEventKind::Any) {
                            continue;
                        }
                        let Some(path) = relative_path(&watch_root, &event.path) else {
                            continue;
                        };
                        if event.path.is_dir() || filter.is_ignored(&path) {
                            continue;
                        }
                        if let Err(e) = event_tx.send(WorkspaceChange { path }) {
                            error!("Failed to send workspace change event: {}", e);
                        }
                    }
                }
                Err(e) => {
                    error!("File watcher error: {}", e);
                }
            },
        )
        .map_err(|e| TidemarkError::watch(format!("Failed to create file watcher: {}", e)))?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| TidemarkError::watch(format!("Failed to watch directory: {}", e)))?;

        info!("Watching workspace: {:?}", root);
        Ok(Self {
            debouncer,
            event_rx,
            root,
        })
    }

    /// Get the next change event (async)
    pub async fn next_event(&mut self) -> Option<WorkspaceChange> {
        self.event_rx.recv().await
    }

    /// Try to get the next change event without blocking
    pub fn try_next_event(&mut self) -> Option<WorkspaceChange> {
        self.event_rx.try_recv().ok()
    }

    /// Watched root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Workspace-relative form of an absolute event path
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => {
            Some(normalize_path(&relative.to_string_lossy()))
        }
        _ => {
            debug!("Ignoring event outside the workspace: {:?}", path);
            None
        }
    }
}
