//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;

use commands::Commands;
use output::OutputConfig;

/// pyodide-lock - manipulate pyodide-lock.json lock files
///
/// Validate lock files, add wheels to them, and update them with `uv`.
#[derive(Parser, Debug)]
#[command(name = "pyodide-lock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.verbose)
    }

    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let output = self.output_config();
        if let Some(cmd) = self.command {
            cmd.run(&output).await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
