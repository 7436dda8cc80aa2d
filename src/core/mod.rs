//! Core lock file logic
//!
//! # Submodules
//!
//! - [`spec`] - Lock file data model, load and save
//! - [`schema`] - Field-level validation and the JSON Schema export
//! - [`serialize`] - Byte-stable JSON output
//! - [`check`] - Dependency and wheel file name checks
//! - [`wheel`] - Wheel file names and archive contents
//! - [`metadata`] - Core metadata and PEP 508 requirements
//! - [`marker`] - PEP 508 environment markers
//! - [`name`] - Package name normalization
//! - [`version`] - PEP 440 versions
//! - [`add_wheels`] - Adding local wheels to a lock file
//! - [`requirements`] - Solver input files
//! - [`pylock`] - Solver output (`pylock.toml`)
//! - [`update`] - Updating a lock file with `uv pip compile`
//! - [`global_config`] - User-wide configuration

pub mod add_wheels;
pub mod check;
pub mod global_config;
pub mod marker;
pub mod metadata;
pub mod name;
pub mod pylock;
pub mod requirements;
pub mod schema;
pub mod serialize;
pub mod spec;
pub mod update;
pub mod version;
pub mod wheel;
