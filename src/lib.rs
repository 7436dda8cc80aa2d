//! pyodide-lock - read, validate, and update `pyodide-lock.json` files
//!
//! A `pyodide-lock.json` pins every package of a Pyodide distribution to an
//! exact version and artifact. This crate loads and validates lock files,
//! writes them back byte-for-byte, adds local wheels, and updates a lock
//! file with `uv pip compile`.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Lock file model, validation, and the update engine
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;

pub use crate::core::spec::{InfoSpec, PackageSpec, PyodideLockSpec};
