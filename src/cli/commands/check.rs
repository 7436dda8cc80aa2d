//! Check command implementation
//!
//! Implements `pyodide-lock check` to validate a lock file and report every
//! problem found.

use anyhow::{bail, Result};
use std::path::Path;

use crate::cli::output::{status, OutputConfig};
use crate::core::check::{self, DependencyPolicy};
use crate::core::spec::PyodideLockSpec;
use crate::error::LockError;

/// Execute the check command
pub async fn execute(input: &Path, policy: DependencyPolicy, out: &OutputConfig) -> Result<()> {
    if !input.exists() {
        bail!("No lock file found at {}", input.display());
    }

    let spec = match PyodideLockSpec::from_json(input) {
        Ok(spec) => spec,
        Err(LockError::Schema(e)) => {
            // Problems go to stderr even with --quiet
            eprintln!(
                "{} {} has {} schema violation(s)",
                status::ERROR,
                input.display(),
                e.violations.len()
            );
            for violation in &e.violations {
                eprintln!("  {violation}");
            }
            bail!("{} is not a valid lock file", input.display());
        }
        Err(e) => return Err(e.into()),
    };
    out.success("Schema is valid");

    let result = check::check(&spec, policy);

    if result.wheel_mismatches.is_empty() {
        out.success("Wheel file names match package names and versions");
    } else {
        eprintln!("{} Wheel file name mismatches found", status::ERROR);
        for (name, errors) in &result.wheel_mismatches {
            for error in errors {
                eprintln!("  - {name}: {error}");
            }
        }
    }

    if result.missing_dependencies.is_empty() {
        out.success("All dependencies are in the lock file");
    } else if policy == DependencyPolicy::Error {
        eprintln!("{} Missing dependencies found", status::ERROR);
        for (name, deps) in &result.missing_dependencies {
            eprintln!("  - {name} -> {}", deps.join(", "));
        }
    }

    for warning in &result.warnings {
        out.warning(warning);
    }

    if !result.is_valid() {
        bail!("Check failed for {}", input.display());
    }

    out.success(format!(
        "{} is valid ({} packages)",
        input.display(),
        result.package_count
    ));
    Ok(())
}
