//! Watch mode: record filesystem changes until interrupted

use anyhow::{Context, Result};
use std::time::Duration;
use tidemark_core::checkpoints::{Checkpoint, CheckpointTrigger, WorkspaceWatcher};

use super::CommandContext;

/// Upper bound on the flush tick, so short windows are honored promptly
const MAX_FLUSH_TICK: Duration = Duration::from_secs(1);
const MIN_TICK: Duration = Duration::from_millis(50);

/// Run the watch loop
///
/// Captures the initial state, records edits made while nothing was
/// watching, then turns every debounced filesystem event into a recorded
/// change. Due batches are flushed on a tick and snapshots are downsampled
/// every `cleanup_interval`. Ctrl-C builds a final checkpoint of whatever is
/// still pending.
pub async fn run(ctx: &CommandContext) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let settings = manager.config().settings.clone();

    if let Some(initial) = manager.ensure_initial_state().await? {
        ctx.console.success(&format!(
            "Captured initial state of {} files",
            initial.file_count()
        ));
    }
    let offline = manager.sync_workspace().await?;
    if !offline.is_empty() {
        ctx.console.info(&format!(
            "Recorded {} files changed while not watching",
            offline.len()
        ));
    }

    let mut watcher = WorkspaceWatcher::new(
        &manager.config().project_root,
        manager.path_filter().clone(),
        settings.watch_debounce,
    )
    .context("Failed to start watching the workspace")?;
    ctx.console.success(&format!(
        "Watching {} (Ctrl-C to stop)",
        watcher.root().display()
    ));

    let flush_period = settings.flush_window.clamp(MIN_TICK, MAX_FLUSH_TICK);
    let mut flush_tick = tokio::time::interval(flush_period);
    let mut cleanup_tick = tokio::time::interval(settings.cleanup_interval.max(MIN_TICK));
    // The first tick completes immediately
    cleanup_tick.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(change) = watcher.next_event() => {
                tracing::debug!("Change detected: {}", change.path);
                match manager.record_file_change(&change.path).await {
                    Ok(outcome) => {
                        if let Some(checkpoint) = outcome.checkpoint {
                            report_checkpoint(ctx, &checkpoint);
                        }
                    }
                    Err(e) => ctx.console.warn(&format!("Failed to record {}: {}", change.path, e)),
                }
            }
            _ = flush_tick.tick() => {
                if let Err(e) = manager.flush_due().await {
                    ctx.console.warn(&format!("Flush failed: {}", e));
                }
                match manager.check_triggers().await {
                    Ok(Some(checkpoint)) => report_checkpoint(ctx, &checkpoint),
                    Ok(None) => {}
                    Err(e) => ctx.console.warn(&format!("Automatic checkpoint failed: {}", e)),
                }
            }
            _ = cleanup_tick.tick() => {
                match manager.cleanup_all().await {
                    Ok(removed) if removed > 0 => {
                        ctx.console.info(&format!("Downsampled {} snapshots", removed));
                    }
                    Ok(_) => {}
                    Err(e) => ctx.console.warn(&format!("Snapshot cleanup failed: {}", e)),
                }
            }
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    ctx.console.info("Stopping watcher");
    if let Some(checkpoint) = manager
        .build_checkpoint(
            CheckpointTrigger::Automatic,
            Some("End of watch session".to_string()),
        )
        .await?
    {
        report_checkpoint(ctx, &checkpoint);
    }
    Ok(())
}

fn report_checkpoint(ctx: &CommandContext, checkpoint: &Checkpoint) {
    ctx.console.success(&format!(
        "Checkpoint {} ({} files, {} changes)",
        checkpoint.id,
        checkpoint.file_count(),
        checkpoint.change_count()
    ));
}
