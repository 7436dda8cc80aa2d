//! Add-wheels command implementation
//!
//! Implements `pyodide-lock add-wheels` to add local wheels to a lock file.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::cli::output::OutputConfig;
use crate::core::add_wheels::{add_wheels_to_spec, AddWheelsOptions};
use crate::core::spec::PyodideLockSpec;

/// Options for the add-wheels command
#[derive(Debug, Clone)]
pub struct AddWheelsArgs {
    pub wheels: Vec<PathBuf>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub base_path: Option<PathBuf>,
    pub wheel_url: String,
    pub ignore_missing_dependencies: bool,
    pub indent: Option<usize>,
}

/// Execute the add-wheels command
pub async fn execute(args: AddWheelsArgs, out: &OutputConfig) -> Result<()> {
    for wheel in &args.wheels {
        if !wheel.is_file() {
            bail!("Wheel not found: {}", wheel.display());
        }
    }

    let spec = PyodideLockSpec::from_json(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let options = AddWheelsOptions {
        base_path: args.base_path,
        base_url: args.wheel_url,
        ignore_missing_dependencies: args.ignore_missing_dependencies,
    };
    let updated = add_wheels_to_spec(&spec, &args.wheels, &options)
        .context("Failed to add wheels")?;

    updated
        .to_json(&args.output, args.indent)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    for wheel in &args.wheels {
        tracing::info!("Added {}", wheel.display());
    }
    out.success(format!(
        "Added {} wheel(s); wrote {} package(s) to {}",
        args.wheels.len(),
        updated.packages.len(),
        args.output.display()
    ));
    Ok(())
}
