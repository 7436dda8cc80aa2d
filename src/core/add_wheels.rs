//! Adding local wheels to a lock spec
//!
//! Each wheel becomes a package entry whose dependencies are resolved
//! against the lock spec, including dependencies requested through extras
//! (`needs-one-opt[with_one]`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::metadata::{push_unique, WheelMetadata};
use crate::core::spec::{PackageSpec, PyodideLockSpec};
use crate::core::wheel::read_metadata;
use crate::error::{AddWheelsError, DependencyError, WheelError};
use crate::infra::filesystem::{relative_to, to_posix};

/// Options for [`add_wheels_to_spec`]
#[derive(Debug, Clone, Default)]
pub struct AddWheelsOptions {
    /// Directory wheel file names are made relative to (default: the first
    /// wheel's directory)
    pub base_path: Option<PathBuf>,
    /// Prefix for every new `file_name`
    pub base_url: String,
    /// Accept dependencies that neither the lock spec nor the new wheels provide
    pub ignore_missing_dependencies: bool,
}

struct AddedWheel {
    key: String,
    metadata: WheelMetadata,
}

/// Return a copy of `spec` with `wheels` added
///
/// An existing entry for the same package is replaced in place.
pub fn add_wheels_to_spec(
    spec: &PyodideLockSpec,
    wheels: &[PathBuf],
    options: &AddWheelsOptions,
) -> Result<PyodideLockSpec, AddWheelsError> {
    let env = spec.marker_environment();
    let base_path = options.base_path.clone().unwrap_or_else(|| {
        wheels
            .first()
            .and_then(|w| w.parent())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    });

    let mut updated = spec.clone();
    let mut added = Vec::with_capacity(wheels.len());

    for wheel in wheels {
        let mut package = PackageSpec::from_wheel(wheel, &env)?;
        let relative =
            relative_to(wheel, &base_path).ok_or_else(|| AddWheelsError::PathOutsideBase {
                path: wheel.clone(),
                base: base_path.clone(),
            })?;
        package.file_name = format!("{}{}", options.base_url, to_posix(&relative));
        tracing::debug!("Adding {} {} as {}", package.name, package.version, package.file_name);

        let key = package.name.clone();
        updated.insert_package(package);
        added.push(AddedWheel {
            key,
            metadata: read_metadata(wheel)?,
        });
    }

    // Dependencies pulled in through `pkg[extra]` land on `pkg` itself
    for wheel in &added {
        for req in wheel.metadata.requirements().map_err(WheelError::from)? {
            if req.extras.is_empty() || !req.applies(&env, &[]) {
                continue;
            }
            let target_name = req.canonical_name();
            let Some(target) = added.iter().find(|w| w.key == target_name) else {
                tracing::debug!(
                    "Extras of {target_name} requested by {} are not among the new wheels",
                    wheel.key
                );
                continue;
            };
            let extra_deps = target
                .metadata
                .extra_dependencies(&env, &req.extras)
                .map_err(WheelError::from)?;
            if let Some(package) = updated.get_package_mut(&target_name) {
                for dep in extra_deps {
                    push_unique(&mut package.depends, dep);
                }
            }
        }
    }

    let mut missing: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for wheel in &added {
        if let Some(package) = updated.get_package(&wheel.key) {
            for dep in &package.depends {
                if !updated.contains_package(dep) {
                    missing.entry(wheel.key.clone()).or_default().push(dep.clone());
                }
            }
        }
    }
    if !missing.is_empty() {
        if options.ignore_missing_dependencies {
            tracing::warn!("Ignoring missing dependencies: {}", DependencyError { missing });
        } else {
            return Err(DependencyError { missing }.into());
        }
    }

    Ok(updated)
}

impl PyodideLockSpec {
    /// Add `wheels` in place; see [`add_wheels_to_spec`]
    pub fn add_wheels(
        &mut self,
        wheels: &[PathBuf],
        options: &AddWheelsOptions,
    ) -> Result<(), AddWheelsError> {
        *self = add_wheels_to_spec(self, wheels, options)?;
        Ok(())
    }
}
