//! CLI commands

pub mod checkpoint;
pub mod file;
pub mod watch;
pub mod workspace;

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tidemark_core::checkpoints::{Checkpoint, CheckpointId, CheckpointManager};
use tidemark_core::{CheckpointManagerConfig, load_config};

use crate::args::{Cli, WORKSPACE_CONFIG_FILE};
use crate::console::CliConsole;

/// Everything a command needs: resolved settings, output mode and console
pub struct CommandContext {
    pub config: CheckpointManagerConfig,
    pub json: bool,
    pub console: CliConsole,
}

impl CommandContext {
    /// Resolve the workspace root and configuration from the command line
    pub fn load(cli: &Cli) -> Result<Self> {
        let workspace = match &cli.workspace {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let workspace = std::fs::canonicalize(&workspace)
            .with_context(|| format!("Workspace {} does not exist", workspace.display()))?;

        let config_path = resolve_config_path(cli.config.as_deref(), &workspace);
        let settings = load_config(config_path.as_deref()).with_context(|| match &config_path {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration".to_string(),
        })?;

        Ok(Self {
            config: CheckpointManagerConfig::with_settings(workspace, settings),
            json: cli.json,
            console: CliConsole::new(cli.verbose),
        })
    }

    /// Open the engine for this workspace
    pub async fn open_manager(&self) -> Result<CheckpointManager> {
        CheckpointManager::open(self.config.clone())
            .await
            .with_context(|| format!("Failed to open {}", self.config.storage_path.display()))
    }
}

/// Explicit path, else the workspace config file, else the user config file
fn resolve_config_path(explicit: Option<&Path>, workspace: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let in_workspace = workspace.join(WORKSPACE_CONFIG_FILE);
    if in_workspace.exists() {
        return Some(in_workspace);
    }
    dirs::config_dir()
        .map(|dir| dir.join("tidemark").join("config.toml"))
        .filter(|path| path.exists())
}

/// Find a checkpoint by exact id or unique prefix
pub async fn resolve_checkpoint(manager: &CheckpointManager, id: &str) -> Result<Checkpoint> {
    if let Some(checkpoint) = manager
        .get_checkpoint(&CheckpointId::from_string(id))
        .await?
    {
        return Ok(checkpoint);
    }

    let matches: Vec<_> = manager
        .list_checkpoints()
        .await
        .into_iter()
        .filter(|s| s.id.as_str().starts_with(id))
        .collect();
    match matches.as_slice() {
        [] => bail!("No checkpoint matches '{}'", id),
        [only] => manager
            .get_checkpoint(&only.id)
            .await?
            .with_context(|| format!("Checkpoint {} is listed but missing on disk", only.id)),
        _ => bail!("'{}' matches {} checkpoints, use a longer prefix", id, matches.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_wins() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(WORKSPACE_CONFIG_FILE), "").unwrap();

        let explicit = PathBuf::from("/etc/tidemark.yaml");
        assert_eq!(
            resolve_config_path(Some(&explicit), temp_dir.path()),
            Some(explicit)
        );
    }

    #[test]
    fn test_workspace_config_is_found() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(WORKSPACE_CONFIG_FILE);
        std::fs::write(&path, "edit_threshold = 4\n").unwrap();

        assert_eq!(resolve_config_path(None, temp_dir.path()), Some(path));
    }
}
