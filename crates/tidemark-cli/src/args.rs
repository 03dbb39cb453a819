//! CLI argument definitions using clap
//!
//! - tidemark init                     # Capture the initial state
//! - tidemark watch                    # Record edits from the filesystem
//! - tidemark checkpoint -m "msg"      # Build a manual checkpoint
//! - tidemark restore <file> --at <t>  # Roll one file back in time

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Config file looked up in the workspace root when `--config` is not given
pub const WORKSPACE_CONFIG_FILE: &str = "tidemark.toml";

#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(about = "Tidemark - incremental checkpoints for live-edited file trees")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (JSON, TOML or YAML)
    #[arg(long, global = true, env = "TIDEMARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Workspace root (defaults to the current directory)
    #[arg(long, short = 'w', global = true)]
    pub workspace: Option<PathBuf>,

    /// Print machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Capture the initial state of the workspace
    Init,

    /// Show engine state and the latest checkpoint
    Status,

    /// Build a manual checkpoint from pending changes
    Checkpoint {
        /// Checkpoint description
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },

    /// List checkpoints, oldest first
    List,

    /// Show one checkpoint
    Show {
        /// Checkpoint id or unique prefix
        id: String,
    },

    /// Delete a checkpoint
    Delete {
        /// Checkpoint id or unique prefix
        id: String,
    },

    /// Restore a file to its content at a point in time
    Restore {
        /// Workspace-relative file path
        file: String,

        /// Milliseconds since the epoch or an RFC 3339 timestamp
        #[arg(long)]
        at: String,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Restore every file captured by a checkpoint
    RestoreCheckpoint {
        /// Checkpoint id or unique prefix
        id: String,

        /// Only restore these files
        #[arg(long = "file", short = 'f')]
        files: Vec<String>,

        /// Show what would be restored without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a file's timeline
    Timeline {
        /// Workspace-relative file path
        file: String,
    },

    /// Show the edit minimap of a file
    Minimap {
        /// Workspace-relative file path
        file: String,
    },

    /// Show every checkpoint that captured a file
    History {
        /// Workspace-relative file path
        file: String,
    },

    /// Downsample old snapshots of every tracked file
    Cleanup,

    /// Watch the workspace and record changes until interrupted
    Watch,
}
