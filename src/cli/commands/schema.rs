//! Schema command implementation

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output::OutputConfig;
use crate::core::{schema, serialize};
use crate::infra::filesystem;

/// Print or write the JSON Schema of `pyodide-lock.json`
pub async fn execute(output: Option<&Path>, indent: usize, out: &OutputConfig) -> Result<()> {
    let text = serialize::to_string(&schema::json_schema(), Some(indent))
        .context("Failed to serialize schema")?;

    match output {
        Some(path) => {
            filesystem::write_atomic(path, format!("{text}\n").as_bytes())?;
            out.success(format!("Wrote schema to {}", path.display()));
        }
        None => println!("{text}"),
    }
    Ok(())
}
