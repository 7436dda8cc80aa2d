//! Environment variable names

/// Location of the `uv` executable
pub const UV_BIN: &str = "UV_BIN";

/// Override for the config directory
pub const CONFIG_DIR: &str = "PYODIDE_LOCK_CONFIG_DIR";
