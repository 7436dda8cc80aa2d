//! Global configuration
//!
//! User-wide defaults read from `config.toml` in the config directory.
//! Command line flags take precedence over every value here.

use crate::config::defaults;
use crate::infra::dirs::PyodideLockDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// `uv` settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// Path to the `uv` executable
    pub uv_path: Option<PathBuf>,

    /// Value for `--python-platform`
    pub python_platform: Option<String>,

    /// Arguments appended to every `uv pip compile`
    pub extra_args: Option<Vec<String>>,
}

/// Wheel download settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Attempts per wheel
    pub max_retries: Option<u32>,

    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: Option<u64>,

    /// Concurrent downloads
    pub parallel: Option<usize>,
}

/// Lock file output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// JSON indent; compact output when unset
    pub indent: Option<usize>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// A missing file yields the default configuration; an unreadable or
    /// invalid one is an error.
    pub fn load(dirs: &PyodideLockDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    #[must_use]
    pub fn python_platform(&self) -> &str {
        self.solver
            .python_platform
            .as_deref()
            .unwrap_or(defaults::UV_PYODIDE_PLATFORM)
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.fetch
            .max_retries
            .unwrap_or(defaults::MAX_DOWNLOAD_RETRIES)
    }

    #[must_use]
    pub fn base_delay_ms(&self) -> u64 {
        self.fetch
            .base_delay_ms
            .unwrap_or(defaults::RETRY_BASE_DELAY_MS)
    }

    #[must_use]
    pub fn parallel(&self) -> usize {
        self.fetch
            .parallel
            .unwrap_or(defaults::DEFAULT_PARALLEL_DOWNLOADS)
    }
}
