//! Workspace-level commands (init, status, cleanup)

use anyhow::Result;
use colored::*;
use tidemark_core::CheckpointSummary;
use tidemark_core::clock::format_millis;

use super::CommandContext;

/// Capture the initial state if the workspace has no checkpoint yet
pub async fn init(ctx: &CommandContext) -> Result<()> {
    let manager = ctx.open_manager().await?;
    match manager.ensure_initial_state().await? {
        Some(checkpoint) => {
            if ctx.json {
                return ctx
                    .console
                    .print_json(&CheckpointSummary::from(&checkpoint));
            }
            ctx.console.success(&format!(
                "Captured initial state of {} files in {}",
                checkpoint.file_count(),
                manager.config().storage_path.display()
            ));
        }
        None => {
            if ctx.json {
                return ctx.console.print_json(&serde_json::Value::Null);
            }
            ctx.console
                .warn("Workspace already has checkpoints, initial state left unchanged");
        }
    }
    Ok(())
}

/// Show engine counters and the latest checkpoint
pub async fn status(ctx: &CommandContext) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let status = manager.status().await?;
    if ctx.json {
        return ctx.console.print_json(&status);
    }

    ctx.console.print_header("Tidemark Status");
    ctx.console
        .print_field("Workspace", manager.config().project_root.display());
    ctx.console
        .print_field("Storage", manager.config().storage_path.display());
    ctx.console.print_field(
        "Checkpoints",
        format!(
            "{} / {}",
            status.checkpoints,
            manager.config().settings.max_checkpoints
        ),
    );
    ctx.console.print_field(
        "Initial state",
        if status.has_initial_state {
            "captured".green()
        } else {
            "missing (run `tidemark init`)".yellow()
        },
    );
    ctx.console
        .print_field("Tracked files", status.tracked_files);
    ctx.console.print_field(
        "Last checkpoint",
        format_millis(status.last_checkpoint_time),
    );

    if let Some(latest) = manager.list_checkpoints().await.last() {
        println!();
        println!("{}", "Latest".cyan().bold());
        ctx.console.print_checkpoint(latest);
    }
    Ok(())
}

/// Downsample every tracked file's timeline
pub async fn cleanup(ctx: &CommandContext) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let removed = manager.cleanup_all().await?;
    if ctx.json {
        return ctx
            .console
            .print_json(&serde_json::json!({ "removed_snapshots": removed }));
    }
    if removed == 0 {
        ctx.console.info("No snapshots to downsample");
    } else {
        ctx.console
            .success(&format!("Removed {} snapshots", removed));
    }
    Ok(())
}
