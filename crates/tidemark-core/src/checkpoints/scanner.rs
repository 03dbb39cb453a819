//! Workspace scanning and path filtering

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{TidemarkError, TidemarkResult};
use crate::host::normalize_path;

/// Decides which workspace paths are tracked
#[derive(Debug, Clone)]
pub struct PathFilter {
    /// Directory names skipped at any depth
    excluded_dirs: HashSet<String>,
    /// Glob patterns relative to the workspace root
    ignored: Vec<Pattern>,
}

impl PathFilter {
    /// Create a filter with the default excluded directories plus `storage_dir`
    pub fn new(storage_dir: &Path, ignored_paths: &[String]) -> TidemarkResult<Self> {
        let mut excluded_dirs = Self::default_excluded_dirs();
        if let Some(name) = storage_dir.file_name() {
            excluded_dirs.insert(name.to_string_lossy().into_owned());
        }

        let ignored = ignored_paths
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            excluded_dirs,
            ignored,
        })
    }

    /// Default excluded directories
    fn default_excluded_dirs() -> HashSet<String> {
        [".git", "node_modules", "target", "out", "dist"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Exclude another directory name
    pub fn exclude_dir(mut self, dir: impl Into<String>) -> Self {
        self.excluded_dirs.insert(dir.into());
        self
    }

    /// Whether a directory with this name is skipped
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.contains(name)
    }

    /// Whether a workspace-relative path should not be tracked
    pub fn is_ignored(&self, relative: &str) -> bool {
        let relative = normalize_path(relative);
        let mut components = relative.split('/').collect::<Vec<_>>();
        components.pop();
        if components.iter().any(|c| self.is_excluded_dir(c)) {
            return true;
        }

        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        let file_name = relative.rsplit('/').next().unwrap_or(&relative);
        self.ignored.iter().any(|pattern| {
            pattern.matches_with(&relative, options)
                || (!pattern.as_str().contains('/') && pattern.matches_with(file_name, options))
        })
    }
}

/// Walks a workspace and lists its trackable files
pub struct WorkspaceScanner {
    root: PathBuf,
    filter: PathFilter,
}

impl WorkspaceScanner {
    /// Create a scanner for `root`
    pub fn new(root: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    /// Workspace-relative paths of every tracked file, sorted
    pub async fn scan(&self) -> TidemarkResult<Vec<String>> {
        let mut files = Vec::new();
        self.scan_recursive(&self.root, &mut files).await?;
        files.sort();
        Ok(files)
    }

    async fn scan_recursive(&self, dir: &Path, files: &mut Vec<String>) -> TidemarkResult<()> {
        let mut entries = fs::read_dir(dir).await.map_err(|e| {
            TidemarkError::io_with_path(
                format!("Failed to read directory: {}", e),
                dir.display().to_string(),
            )
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TidemarkError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };

            if file_type.is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !self.filter.is_excluded_dir(&name) {
                    Box::pin(self.scan_recursive(&path, files)).await?;
                }
            } else if file_type.is_file() {
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let relative = normalize_path(&relative.to_string_lossy());
                if !self.filter.is_ignored(&relative) {
                    files.push(relative);
                }
            }
        }

        Ok(())
    }
}
