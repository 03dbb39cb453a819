//! Tidemark CLI application
//!
//! Drives the checkpoint engine against a workspace directory.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/tidemark-cli
//! ```
//!
//! # Typical session
//!
//! ```bash
//! tidemark init                       # capture the initial state
//! tidemark watch                      # record edits as files change
//! tidemark checkpoint -m "before refactor"
//! tidemark restore src/main.rs --at 2024-05-01T10:00:00Z
//! ```

mod args;
mod commands;
mod console;
mod logging;
mod router;

use args::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let context = commands::CommandContext::load(&cli)?;
    logging::init(&context.config.settings.logging, cli.verbose);

    if router::route(cli.command, context).await.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
