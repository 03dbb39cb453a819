//! Workspace host collaborator
//!
//! The engine never touches live files directly: it reads and writes them
//! through a [`WorkspaceHost`], which lets editors plug in their own buffers
//! and lets tests inject failures.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::checkpoints::minimap::LineProfile;
use crate::error::{TidemarkError, TidemarkResult};
use crate::persist;

/// Access to the live content of workspace files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkspaceHost: Send + Sync {
    /// Read the full content of a workspace-relative file
    async fn read_file(&self, path: &str) -> TidemarkResult<String>;

    /// Replace the content of a workspace-relative file
    async fn write_file(&self, path: &str, content: &str) -> TidemarkResult<()>;

    /// Line count of the file and the indentation of `line_number`
    async fn line_profile(&self, path: &str, line_number: usize) -> TidemarkResult<LineProfile> {
        let content = self.read_file(path).await?;
        Ok(LineProfile::from_content(&content, line_number))
    }
}

/// Normalize a workspace-relative path to forward slashes without a leading `./`
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

/// Filesystem-backed host rooted at a workspace directory
///
/// Whole-file reads load the file at once. Line profiles are streamed line
/// by line through a buffer of at most `chunk_size` bytes.
#[derive(Debug, Clone)]
pub struct FsHost {
    root: PathBuf,
    chunk_size: usize,
}

impl FsHost {
    /// Create a host for `root` with the default 1 MiB line buffer cap
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: 1024 * 1024,
        }
    }

    /// Cap the read buffer used when streaming line profiles
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path, refusing to escape the root
    pub fn resolve(&self, path: &str) -> TidemarkResult<PathBuf> {
        let normalized = normalize_path(path);
        let relative = Path::new(&normalized);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if normalized.is_empty() || escapes {
            return Err(TidemarkError::invalid_input_field(
                format!("Path must stay inside the workspace: {}", path),
                "file_path",
            ));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> TidemarkError {
    TidemarkError::io_with_path(
        format!("Failed to {} file: {}", action, e),
        path.display().to_string(),
    )
}

#[async_trait]
impl WorkspaceHost for FsHost {
    async fn read_file(&self, path: &str) -> TidemarkResult<String> {
        let full_path = self.resolve(path)?;
        let bytes = fs::read(&full_path)
            .await
            .map_err(|e| io_error("read", &full_path, e))?;

        String::from_utf8(bytes).map_err(|e| {
            TidemarkError::io_with_path(
                format!("File is not valid UTF-8: {}", e),
                full_path.display().to_string(),
            )
        })
    }

    async fn write_file(&self, path: &str, content: &str) -> TidemarkResult<()> {
        let full_path = self.resolve(path)?;
        persist::write_atomic(&full_path, content.as_bytes()).await
    }

    async fn line_profile(&self, path: &str, line_number: usize) -> TidemarkResult<LineProfile> {
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| io_error("open", &full_path, e))?;
        let mut lines = BufReader::with_capacity(self.chunk_size.min(64 * 1024), file).lines();

        let mut profile = LineProfile::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| io_error("read", &full_path, e))?
        {
            profile.observe(&line, line_number);
        }
        Ok(profile)
    }
}
