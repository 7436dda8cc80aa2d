//! Error types for pyodide-lock
//!
//! Domain-specific error types using thiserror.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single field-level problem found while validating a lock document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted JSON path of the offending field (e.g. `packages.numpy.version`)
    pub path: String,
    /// What is wrong with it
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Malformed or missing document fields
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{source_name} failed schema validation with {} violation(s):\n{}",
    .violations.len(),
    format_violations(.violations)
)]
pub struct SchemaError {
    /// File path or other label of the validated document
    pub source_name: String,
    /// Every violation found, in document order
    pub violations: Vec<FieldViolation>,
}

impl SchemaError {
    /// Whether any violation was reported for `path`
    pub fn has_violation_at(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

fn format_mismatches(mismatches: &IndexMap<String, Vec<String>>) -> String {
    mismatches
        .iter()
        .map(|(name, errors)| format!("  - {name}:\n    - {}", errors.join("\n    - ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wheel filename and package metadata disagree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("check_wheel_filenames failed:\n{}", format_mismatches(.mismatches))]
pub struct ConsistencyError {
    /// Package key -> every mismatch found for it
    pub mismatches: IndexMap<String, Vec<String>>,
}

/// A PEP 508 requirement or marker could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid requirement '{requirement}': {reason}")]
pub struct RequirementError {
    pub requirement: String,
    pub reason: String,
}

/// Wheel archive errors
#[derive(Error, Debug)]
pub enum WheelError {
    /// File does not carry a wheel extension
    #[error("{path} is not a wheel")]
    NotAWheel { path: PathBuf },

    /// Archive could not be opened or read
    #[error("Failed to read wheel archive '{path}': {error}")]
    Archive { path: PathBuf, error: String },

    /// No usable `*.dist-info/METADATA`
    #[error("Could not parse wheel metadata from {name}")]
    MissingMetadata { name: String },

    /// File name does not follow the wheel grammar
    #[error("Invalid wheel filename '{file_name}': {reason}")]
    InvalidFilename { file_name: String, reason: String },

    /// Requirement in the metadata could not be parsed
    #[error("Invalid dependency in wheel metadata: {0}")]
    Requirement(#[from] RequirementError),

    /// IO error
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to remove file
    #[error("Failed to remove file '{path}': {error}")]
    RemoveFile { path: PathBuf, error: String },
}

/// Lock file load/save errors
#[derive(Error, Debug)]
pub enum LockError {
    /// Could not read or write the file
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Not valid JSON
    #[error("Failed to parse JSON from '{source_name}': {error}")]
    Json { source_name: String, error: String },

    /// Valid JSON but not a valid lock document
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Output could not be written
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Errors reported by the external dependency solver adapter
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The `uv` binary could not be located
    #[error(
        "The `uv` executable could not be found.\n\nTry one of:\n  - install `uv` on PATH\n  - set ${env_var} to the location of `uv`\n  - pass an explicit --uv-path"
    )]
    UvNotFound { env_var: String },

    /// The solver ran but reported failure
    #[error("Failed to generate '{output_file}' with `{command}`:\n{output}")]
    SolverFailed {
        command: String,
        output_file: PathBuf,
        output: String,
    },

    /// The solver could not be started
    #[error("Failed to run '{program}': {error}")]
    Spawn { program: PathBuf, error: String },

    /// The solver output could not be parsed
    #[error("Invalid pylock.toml at '{path}': {error}")]
    InvalidPylock { path: PathBuf, error: String },

    /// A solved package names no usable artifact
    #[error("The pylock.toml package entry '{name}' cannot be resolved to a wheel")]
    UnresolvableWheel { name: String },

    /// A spec passed to the solver is not valid PEP 508
    #[error(transparent)]
    Requirement(#[from] RequirementError),

    /// A lock entry has no location the solver could install from
    #[error("Could not construct PEP-508 URL for '{name}' ({file_name})")]
    Pep508Url { name: String, file_name: String },

    /// A wheel passed to the solver could not be read
    #[error("Failed to read wheel for the solver: {0}")]
    Wheel(#[from] WheelError),

    /// Solver inputs could not be written or outputs read
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Artifact fetch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network error
    #[error("Network error fetching '{location}': {error}")]
    Network { location: String, error: String },

    /// The store has no such artifact
    #[error("Artifact not found: '{location}'")]
    NotFound { location: String },

    /// Checksum verification failed
    #[error("Checksum mismatch for '{location}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        location: String,
        expected: String,
        actual: String,
    },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Every attempt failed
    #[error("Fetching '{location}' failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        location: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchError {
    /// Location (URL or path) the failure relates to
    pub fn location(&self) -> String {
        match self {
            Self::Network { location, .. }
            | Self::NotFound { location }
            | Self::ChecksumMismatch { location, .. }
            | Self::RetriesExhausted { location, .. } => location.clone(),
            Self::Io { path, .. } => path.display().to_string(),
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Io { .. })
    }
}

fn format_missing(missing: &BTreeMap<String, Vec<String>>) -> String {
    missing
        .iter()
        .map(|(name, deps)| format!("{name} -> {}", deps.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Dependencies that name packages absent from the lock file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing dependencies: {}", format_missing(.missing))]
pub struct DependencyError {
    /// Package -> dependencies not present in the lock file
    pub missing: BTreeMap<String, Vec<String>>,
}

/// Errors from adding wheels to a lock spec
#[derive(Error, Debug)]
pub enum AddWheelsError {
    /// A wheel could not be read
    #[error(transparent)]
    Wheel(#[from] WheelError),

    /// New packages depend on packages that are not available
    #[error(transparent)]
    MissingDependencies(#[from] DependencyError),

    /// A wheel is not located below the base path
    #[error("Wheel '{path}' is not inside base path '{base}'")]
    PathOutsideBase { path: PathBuf, base: PathBuf },
}

/// Errors from the update engine
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Baseline could not be loaded or output written
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The solver failed; no partial result
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Solved wheels could not be merged
    #[error(transparent)]
    AddWheels(#[from] AddWheelsError),

    /// The merged lock file has dangling dependencies
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Wheels could not be placed in the wheel directory
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}
