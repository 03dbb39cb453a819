//! Command routing logic for CLI

use anyhow::Result;

use crate::args::Commands;
use crate::commands::{self, CommandContext};

/// Route CLI commands to their respective handlers
pub async fn route(command: Commands, ctx: CommandContext) -> Result<()> {
    let result = match command {
        // Workspace
        Commands::Init => commands::workspace::init(&ctx).await,
        Commands::Status => commands::workspace::status(&ctx).await,
        Commands::Cleanup => commands::workspace::cleanup(&ctx).await,
        Commands::Watch => commands::watch::run(&ctx).await,

        // Checkpoints
        Commands::Checkpoint { message } => commands::checkpoint::create(&ctx, message).await,
        Commands::List => commands::checkpoint::list(&ctx).await,
        Commands::Show { id } => commands::checkpoint::show(&ctx, &id).await,
        Commands::Delete { id } => commands::checkpoint::delete(&ctx, &id).await,
        Commands::RestoreCheckpoint { id, files, dry_run } => {
            commands::checkpoint::restore(&ctx, &id, files, dry_run).await
        }

        // Files
        Commands::Restore { file, at, dry_run } => {
            commands::file::restore(&ctx, &file, &at, dry_run).await
        }
        Commands::Timeline { file } => commands::file::timeline(&ctx, &file).await,
        Commands::Minimap { file } => commands::file::minimap(&ctx, &file).await,
        Commands::History { file } => commands::file::history(&ctx, &file).await,
    };

    if let Err(e) = &result {
        ctx.console.error(&format!("{:#}", e));
    }
    result
}
