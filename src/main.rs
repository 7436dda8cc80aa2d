//! pyodide-lock CLI
//!
//! Entry point for the pyodide-lock command-line application.

use anyhow::Result;
use clap::Parser;

use pyodide_lock::cli::output::display_error;
use pyodide_lock::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output_config = cli.output_config();

    // Initialize tracing subscriber; RUST_LOG overrides the flags
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(output_config.log_level().into())
                .from_env_lossy(),
        )
        .init();

    // Run the command and handle errors
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
