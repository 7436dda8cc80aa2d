//! Uv-pip-compile command implementation
//!
//! Implements `pyodide-lock uv-pip-compile` to update a lock file with new
//! or replaced packages solved by `uv`.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::OutputConfig;
use crate::config::defaults;
use crate::core::check::DependencyPolicy;
use crate::core::global_config::GlobalConfig;
use crate::core::update::{RetryConfig, UvPipCompile};

/// Arguments of `uv-pip-compile`
#[derive(Args, Debug, Clone)]
pub struct UvPipCompileArgs {
    /// Baseline lock file
    #[arg(long, default_value = defaults::DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Lock file to write (default: update the input in place)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory for new wheels (default: next to the output)
    #[arg(long)]
    pub wheel_dir: Option<PathBuf>,

    /// PEP 508 spec to add or replace
    #[arg(long = "spec", value_name = "SPEC")]
    pub specs: Vec<String>,

    /// Local wheel to add or replace
    #[arg(long = "wheel", value_name = "WHEEL")]
    pub wheels: Vec<PathBuf>,

    /// PEP 508 constraint, overriding the baseline pin
    #[arg(long = "constraint", value_name = "SPEC")]
    pub constraints: Vec<String>,

    /// PEP 508 spec to leave out of the solve
    #[arg(long = "exclude", value_name = "SPEC")]
    pub excludes: Vec<String>,

    /// Package to drop from the baseline before solving
    #[arg(long = "remove", value_name = "NAME")]
    pub remove: Vec<String>,

    /// URL of the directory holding the baseline's wheels
    #[arg(long)]
    pub input_base_url: Option<String>,

    /// Reference fetched wheels by URL when it starts with this prefix
    #[arg(long = "preserve-url-prefix", value_name = "PREFIX")]
    pub preserve_url_prefixes: Vec<String>,

    /// Point entries without a local file at this URL
    #[arg(long, value_name = "URL")]
    pub base_url_for_missing: Option<String>,

    /// The `uv` executable (default: `$UV_BIN` if it exists, then `uv` on PATH)
    #[arg(long)]
    pub uv_path: Option<PathBuf>,

    /// `uv` Python platform
    #[arg(long)]
    pub python_platform: Option<String>,

    /// Solver work directory (default: a temporary directory)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// JSON indent; compact when unset
    #[arg(long)]
    pub indent: Option<usize>,

    /// Concurrent wheel downloads
    #[arg(long)]
    pub parallel: Option<usize>,

    /// How to treat dependencies on packages that are not in the result
    #[arg(long, value_enum, default_value_t = DependencyPolicy::Error)]
    pub dangling: DependencyPolicy,

    /// Extra arguments passed to `uv pip compile`
    #[arg(last = true, value_name = "UV_ARGS")]
    pub extra_uv_args: Vec<String>,
}

impl UvPipCompileArgs {
    /// Combine flags with the global config; flags win
    pub fn into_update(self, config: &GlobalConfig) -> UvPipCompile {
        let mut extra_uv_args = config.solver.extra_args.clone().unwrap_or_default();
        extra_uv_args.extend(self.extra_uv_args);

        let mut upc = UvPipCompile::new(self.input);
        upc.output_path = self.output;
        upc.wheel_dir = self.wheel_dir;
        upc.indent = self.indent.or(config.output.indent);
        upc.input_base_url = self.input_base_url;
        upc.preserve_url_prefixes = self.preserve_url_prefixes;
        upc.base_url_for_missing = self.base_url_for_missing;
        upc.specs = self.specs;
        upc.wheels = self.wheels;
        upc.constraints = self.constraints;
        upc.excludes = self.excludes;
        upc.remove = self.remove;
        upc.python_platform = self
            .python_platform
            .unwrap_or_else(|| config.python_platform().to_string());
        upc.uv_path = self.uv_path.or_else(|| config.solver.uv_path.clone());
        upc.extra_uv_args = extra_uv_args;
        upc.work_dir = self.work_dir;
        upc.dependency_policy = self.dangling;
        upc.retry = RetryConfig {
            max_retries: config.max_retries(),
            base_delay_ms: config.base_delay_ms(),
        };
        upc.parallel = self.parallel.unwrap_or_else(|| config.parallel());
        upc
    }
}

/// Execute the uv-pip-compile command
pub async fn execute(
    args: UvPipCompileArgs,
    config: &GlobalConfig,
    out: &OutputConfig,
) -> Result<()> {
    let upc = args.into_update(config);
    let input = upc.input_path.clone();

    let spinner = out.spinner(&format!("Solving {} with uv", input.display()));
    let result = upc.update().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let outcome = result.with_context(|| format!("Failed to update {}", input.display()))?;

    out.success(format!(
        "Wrote {} package(s) to {}",
        outcome.spec.packages.len(),
        outcome.output_path.display()
    ));
    for wheel in &outcome.new_wheels {
        out.info(format!("  new wheel: {}", wheel.display()));
    }

    if !outcome.is_complete() {
        for failure in &outcome.failed {
            out.failure(failure.to_string());
        }
        bail!("{} wheel(s) could not be fetched", outcome.failed.len());
    }
    Ok(())
}
