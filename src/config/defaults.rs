//! Default configuration values

/// Maximum number of download attempts per wheel
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Base delay for exponential backoff between download attempts (ms)
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Default number of parallel downloads
pub const DEFAULT_PARALLEL_DOWNLOADS: usize = 4;

/// Lock file read when no input is given
pub const DEFAULT_INPUT: &str = "pyodide-lock.json";

/// Lock file written by `add-wheels` when no output is given
pub const DEFAULT_OUTPUT: &str = "pyodide-lock-new.json";

/// Install directory of packages built from wheels
pub const DEFAULT_INSTALL_DIR: &str = "site";

/// Platform passed to `uv pip compile --python-platform`
pub const UV_PYODIDE_PLATFORM: &str = "wasm32-pyodide2024";

/// Prefix of the temporary solver work directory
pub const WORK_DIR_PREFIX: &str = "pyodide-lock-upc-";

/// Output file name requested from the solver
pub const PYLOCK_FILE: &str = "pylock.toml";
