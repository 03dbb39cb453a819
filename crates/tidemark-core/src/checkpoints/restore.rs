//! Checkpoint restore operations
//!
//! This module handles writing stored content back through the host.

use super::types::RestoreFailure;
use crate::host::WorkspaceHost;

/// Preview of what will happen during restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestorePreview {
    /// File does not exist (or cannot be read) and will be created
    WillCreate(String),
    /// File exists with different content and will be overwritten
    WillOverwrite(String),
    /// File already holds the stored content
    NoChange(String),
}

impl RestorePreview {
    /// Get the path
    pub fn path(&self) -> &str {
        match self {
            Self::WillCreate(p) | Self::WillOverwrite(p) | Self::NoChange(p) => p,
        }
    }

    /// Whether restoring would write anything
    pub fn changes_file(&self) -> bool {
        !matches!(self, Self::NoChange(_))
    }
}

/// Restore a single file to `content`
pub async fn restore_file(
    host: &dyn WorkspaceHost,
    path: &str,
    content: &str,
) -> Result<(), RestoreFailure> {
    host.write_file(path, content)
        .await
        .map_err(|e| RestoreFailure::WriteFailed(e.to_string()))?;
    tracing::debug!("Restored file: {}", path);
    Ok(())
}

/// Preview what will happen when restoring a file to `content`
pub async fn preview_file_restore(
    host: &dyn WorkspaceHost,
    path: &str,
    content: &str,
) -> RestorePreview {
    match host.read_file(path).await {
        Ok(current) if current == content => RestorePreview::NoChange(path.to_string()),
        Ok(_) => RestorePreview::WillOverwrite(path.to_string()),
        Err(_) => RestorePreview::WillCreate(path.to_string()),
    }
}
