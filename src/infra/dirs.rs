//! Platform-specific config directory
//!
//! Follows XDG on Linux and the standard locations on macOS. The
//! `PYODIDE_LOCK_CONFIG_DIR` environment variable overrides the default.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::env::CONFIG_DIR;

/// Application name used in directory paths
const APP_NAME: &str = "pyodide-lock";

/// Directory provider for pyodide-lock
#[derive(Debug, Clone)]
pub struct PyodideLockDirs {
    config_dir: PathBuf,
}

impl PyodideLockDirs {
    /// Checks the environment first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Directories rooted at an explicit config directory
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/pyodide-lock` or `~/.config/pyodide-lock`
    /// - macOS: `~/Library/Application Support/pyodide-lock`
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path to `config.toml` in the config directory
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_DIR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        Self::platform_config_dir()
    }

    fn platform_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                // Fallback to home directory
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for PyodideLockDirs {
    fn default() -> Self {
        Self::new()
    }
}
