//! Checkpoint commands (checkpoint, list, show, delete, restore-checkpoint)

use anyhow::Result;
use colored::*;
use tidemark_core::checkpoints::{
    CheckpointId, CheckpointManager, CheckpointSummary, CheckpointTrigger, RestoreOptions,
};
use tidemark_core::clock::format_millis;

use super::{CommandContext, resolve_checkpoint};

/// Record on-disk changes and build a manual checkpoint
pub async fn create(ctx: &CommandContext, message: Option<String>) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let changed = manager.sync_workspace().await?;
    ctx.console
        .info(&format!("{} files changed since last recorded", changed.len()));

    match manager
        .build_checkpoint(CheckpointTrigger::Manual, message)
        .await?
    {
        Some(checkpoint) => {
            let summary = CheckpointSummary::from(&checkpoint);
            if ctx.json {
                return ctx.console.print_json(&summary);
            }
            ctx.console.success(&format!(
                "Created checkpoint {} ({} files)",
                checkpoint.id,
                checkpoint.file_count()
            ));
        }
        None => {
            if ctx.json {
                return ctx.console.print_json(&serde_json::Value::Null);
            }
            ctx.console.warn("No changes since the last checkpoint");
        }
    }
    Ok(())
}

/// List checkpoints, oldest first
pub async fn list(ctx: &CommandContext) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let history = manager.list_checkpoints().await;
    if ctx.json {
        return ctx.console.print_json(&history);
    }

    ctx.console
        .print_header(&format!("Checkpoints ({})", history.len()));
    if history.is_empty() {
        println!("  {}", "No checkpoints yet".dimmed());
    }
    for summary in &history {
        ctx.console.print_checkpoint(summary);
    }
    Ok(())
}

/// Show one checkpoint and its files
pub async fn show(ctx: &CommandContext, id: &str) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let checkpoint = resolve_checkpoint(&manager, id).await?;
    if ctx.json {
        return ctx.console.print_json(&checkpoint);
    }

    ctx.console.print_header(&format!("Checkpoint {}", checkpoint.id));
    ctx.console
        .print_field("Created", format_millis(checkpoint.timestamp));
    ctx.console
        .print_field("Description", &checkpoint.metadata.description);
    ctx.console.print_field(
        "Trigger",
        if checkpoint.metadata.is_automatic {
            "automatic"
        } else {
            "manual"
        },
    );
    if checkpoint.metadata.is_initial_state {
        ctx.console.print_field("Initial state", "yes".magenta());
    }

    println!();
    println!("{}", "Files".cyan().bold());
    for (path, file) in &checkpoint.files {
        println!(
            "  {} {} changes, {} snapshots, {} bytes",
            path.yellow(),
            file.changes.len(),
            file.timeline.snapshots.len(),
            file.snapshot.len()
        );
    }
    Ok(())
}

/// Delete one checkpoint
pub async fn delete(ctx: &CommandContext, id: &str) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let checkpoint = resolve_checkpoint(&manager, id).await?;
    manager.delete_checkpoint(&checkpoint.id).await?;
    if ctx.json {
        return ctx
            .console
            .print_json(&serde_json::json!({ "deleted": checkpoint.id }));
    }
    ctx.console
        .success(&format!("Deleted checkpoint {}", checkpoint.id));
    Ok(())
}

/// Write a checkpoint's snapshots back to the workspace
pub async fn restore(
    ctx: &CommandContext,
    id: &str,
    files: Vec<String>,
    dry_run: bool,
) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let checkpoint = resolve_checkpoint(&manager, id).await?;

    let mut options = if dry_run {
        RestoreOptions::dry_run()
    } else {
        RestoreOptions::all()
    };
    options = options.with_files(files);

    if dry_run && !ctx.json {
        print_previews(&manager, &checkpoint.id).await?;
    }

    let result = manager.restore_checkpoint(&checkpoint.id, options).await?;
    if ctx.json {
        let failed: Vec<_> = result
            .failed_files
            .iter()
            .map(|(path, reason)| serde_json::json!({ "path": path, "reason": reason.to_string() }))
            .collect();
        return ctx.console.print_json(&serde_json::json!({
            "checkpoint_id": result.checkpoint_id,
            "dry_run": result.was_dry_run,
            "restored": result.restored_files,
            "failed": failed,
        }));
    }

    for (path, reason) in &result.failed_files {
        ctx.console.error(&format!("{}: {}", path, reason));
    }
    let verb = if result.was_dry_run {
        "Would restore"
    } else {
        "Restored"
    };
    if result.is_success() {
        ctx.console.success(&format!(
            "{} {} files from {}",
            verb,
            result.restored_count(),
            result.checkpoint_id
        ));
    } else {
        ctx.console.warn(&format!(
            "{} {} files from {}, {} failed",
            verb,
            result.restored_count(),
            result.checkpoint_id,
            result.failed_count()
        ));
    }
    Ok(())
}

async fn print_previews(
    manager: &CheckpointManager,
    id: &CheckpointId,
) -> Result<()> {
    for preview in manager.preview_checkpoint_restore(id).await? {
        let label = if preview.changes_file() {
            "change".yellow()
        } else {
            "same".dimmed()
        };
        println!("  [{}] {}", label, preview.path());
    }
    Ok(())
}
