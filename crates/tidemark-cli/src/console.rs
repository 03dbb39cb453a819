//! CLI console utilities

use colored::*;
use tidemark_core::CheckpointSummary;
use tidemark_core::clock::format_millis;

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    /// Create a new CLI console
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    /// Print a header
    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.len()).dimmed());
    }

    /// Print a `label: value` line
    pub fn print_field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {}: {}", label.cyan(), value);
    }

    /// Print one checkpoint summary line
    pub fn print_checkpoint(&self, summary: &CheckpointSummary) {
        let kind = if summary.is_initial_state {
            "initial".magenta()
        } else if summary.is_automatic {
            "auto".blue()
        } else {
            "manual".green()
        };
        println!(
            "  {} {} [{}] {} ({} files, {} changes)",
            summary.id.as_str().yellow(),
            format_millis(summary.timestamp).dimmed(),
            kind,
            summary.description,
            summary.file_count,
            summary.change_count
        );
    }

    /// Print a value as pretty JSON
    pub fn print_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
