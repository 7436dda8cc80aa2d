//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod add_wheels;
pub mod check;
pub mod schema;
pub mod uv_pip_compile;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::output::OutputConfig;
use crate::config::defaults;
use crate::core::check::DependencyPolicy;
use crate::core::global_config::GlobalConfig;
use crate::infra::dirs::PyodideLockDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add wheels to an existing lock file
    ///
    /// Each wheel becomes a package entry. Dependencies are resolved against
    /// the lock file and the other new wheels; by default a dependency that
    /// neither provides is an error.
    AddWheels {
        /// Wheels to add
        #[arg(required = true)]
        wheels: Vec<PathBuf>,

        /// Source lock file
        #[arg(long, default_value = defaults::DEFAULT_INPUT)]
        input: PathBuf,

        /// Updated lock file
        #[arg(long, default_value = defaults::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Wheel file names are made relative to this directory
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Prefix for the new file names, for wheels hosted elsewhere
        #[arg(long, default_value = "")]
        wheel_url: String,

        /// Keep dependencies that no package provides (the result may be broken)
        #[arg(long)]
        ignore_missing_dependencies: bool,

        /// JSON indent; compact when unset
        #[arg(long)]
        indent: Option<usize>,
    },

    /// Validate a lock file
    Check {
        /// Lock file to check
        #[arg(long, default_value = defaults::DEFAULT_INPUT)]
        input: PathBuf,

        /// How to treat dependencies on packages that are not in the lock file
        #[arg(long, value_enum, default_value_t = DependencyPolicy::Error)]
        dangling: DependencyPolicy,
    },

    /// Update a lock file with `uv pip compile`
    UvPipCompile(uv_pip_compile::UvPipCompileArgs),

    /// Print the JSON Schema of the lock file format
    Schema {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// JSON indent
        #[arg(long, default_value_t = 2)]
        indent: usize,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, output: &OutputConfig) -> Result<()> {
        match self {
            Self::AddWheels {
                wheels,
                input,
                output: output_path,
                base_path,
                wheel_url,
                ignore_missing_dependencies,
                indent,
            } => {
                let config = load_global_config()?;
                let options = add_wheels::AddWheelsArgs {
                    wheels,
                    input,
                    output: output_path,
                    base_path,
                    wheel_url,
                    ignore_missing_dependencies,
                    indent: indent.or(config.output.indent),
                };
                add_wheels::execute(options, output).await
            }
            Self::Check { input, dangling } => check::execute(&input, dangling, output).await,
            Self::UvPipCompile(args) => {
                let config = load_global_config()?;
                uv_pip_compile::execute(args, &config, output).await
            }
            Self::Schema {
                output: output_path,
                indent,
            } => schema::execute(output_path.as_deref(), indent, output).await,
        }
    }
}

fn load_global_config() -> Result<GlobalConfig> {
    let dirs = PyodideLockDirs::new();
    GlobalConfig::load(&dirs).with_context(|| {
        format!(
            "Failed to load global config from {}",
            dirs.global_config_path().display()
        )
    })
}
