//! Per-file commands (restore, timeline, minimap, history)

use anyhow::{Context, Result};
use colored::*;
use tidemark_core::checkpoints::{MinimapKind, RestorePreview};
use tidemark_core::clock::{format_millis, parse_millis};

use super::CommandContext;

/// Height of the rendered minimap in rows
const MINIMAP_ROWS: usize = 20;

/// Restore one file to its content at `at`
pub async fn restore(ctx: &CommandContext, file: &str, at: &str, dry_run: bool) -> Result<()> {
    let timestamp = parse_millis(at)
        .with_context(|| format!("'{}' is neither milliseconds nor an RFC 3339 time", at))?;
    let manager = ctx.open_manager().await?;

    if dry_run {
        let preview = manager.preview_restore(file, timestamp).await?;
        let message = match &preview {
            RestorePreview::WillCreate(path) => format!("Would create {}", path),
            RestorePreview::WillOverwrite(path) => format!("Would overwrite {}", path),
            RestorePreview::NoChange(path) => format!("{} already matches", path),
        };
        if ctx.json {
            return ctx.console.print_json(&serde_json::json!({
                "path": preview.path(),
                "changes_file": preview.changes_file(),
            }));
        }
        ctx.console.success(&message);
        return Ok(());
    }

    let content = manager.restore(file, timestamp).await?;
    // Persist the restored event before the process exits
    manager.flush_file(file).await?;

    if ctx.json {
        return ctx.console.print_json(&serde_json::json!({
            "path": file,
            "timestamp": timestamp,
            "bytes": content.len(),
        }));
    }
    ctx.console.success(&format!(
        "Restored {} to its state at {}",
        file,
        format_millis(timestamp)
    ));
    Ok(())
}

/// Print the snapshots and events of a file
pub async fn timeline(ctx: &CommandContext, file: &str) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let Some(timeline) = manager.get_timeline(file).await? else {
        if ctx.json {
            return ctx.console.print_json(&serde_json::Value::Null);
        }
        ctx.console.warn(&format!("No timeline recorded for {}", file));
        return Ok(());
    };
    if ctx.json {
        return ctx.console.print_json(&timeline);
    }

    ctx.console.print_header(&format!("Timeline of {}", timeline.file_path));
    println!("{}", "Snapshots".cyan().bold());
    for snapshot in &timeline.snapshots {
        println!(
            "  {} {} ({} bytes)",
            snapshot.timestamp.to_string().yellow(),
            format_millis(snapshot.timestamp).dimmed(),
            snapshot.content.len()
        );
    }
    println!();
    println!("{}", "Events".cyan().bold());
    for change in &timeline.changes {
        println!(
            "  {} {:>9} line {}",
            change.timestamp.to_string().yellow(),
            change.action.to_string(),
            change.line_number
        );
    }
    Ok(())
}

/// Render the edit minimap of a file as a column of rows
pub async fn minimap(ctx: &CommandContext, file: &str) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let Some(minimap) = manager.get_minimap(file).await? else {
        if ctx.json {
            return ctx.console.print_json(&serde_json::Value::Null);
        }
        ctx.console.warn(&format!("No minimap recorded for {}", file));
        return Ok(());
    };
    if ctx.json {
        return ctx.console.print_json(&minimap);
    }

    ctx.console.print_header(&format!("Minimap of {}", minimap.file_path));
    let mut rows: Vec<Option<MinimapKind>> = vec![None; MINIMAP_ROWS];
    for point in &minimap.points {
        let row = (point.y as usize * MINIMAP_ROWS / 101).min(MINIMAP_ROWS - 1);
        rows[row] = Some(point.kind);
    }
    for (idx, kind) in rows.iter().enumerate() {
        let marker = match kind {
            Some(MinimapKind::Add) => "+".green(),
            Some(MinimapKind::Delete) => "-".red(),
            Some(MinimapKind::Modify) => "~".yellow(),
            None => "·".dimmed(),
        };
        println!("  {:>3}% {}", idx * 100 / MINIMAP_ROWS, marker);
    }
    println!("  {} points", minimap.points.len());
    Ok(())
}

/// List every checkpoint that captured a file
pub async fn history(ctx: &CommandContext, file: &str) -> Result<()> {
    let manager = ctx.open_manager().await?;
    let entries = manager.file_history(file).await?;
    if ctx.json {
        return ctx.console.print_json(&entries);
    }

    ctx.console
        .print_header(&format!("History of {} ({} checkpoints)", file, entries.len()));
    for entry in &entries {
        println!(
            "  {} {} {} ({} changes)",
            entry.checkpoint_id.as_str().yellow(),
            format_millis(entry.timestamp).dimmed(),
            entry.description,
            entry.changes.len()
        );
    }
    Ok(())
}
