//! Lock file consistency checks
//!
//! Dangling `depends` references and wheel file name mismatches, gathered
//! into a single report.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::name::canonicalize_name;
use crate::core::spec::PyodideLockSpec;
use crate::error::DependencyError;

/// What to do about `depends` entries naming absent packages
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DependencyPolicy {
    /// Fail
    #[default]
    Error,
    /// Log a warning and continue
    Warn,
    /// Continue silently
    Ignore,
}

/// Package key -> dependencies missing from the lock spec
pub fn find_missing_dependencies(spec: &PyodideLockSpec) -> BTreeMap<String, Vec<String>> {
    let mut missing: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, package) in &spec.packages {
        for dep in &package.depends {
            if !spec.contains_package(dep) {
                missing.entry(key.clone()).or_default().push(dep.clone());
            }
        }
    }
    missing
}

/// Apply `policy` to dangling dependencies
///
/// Returns whatever is missing when the policy lets it through.
pub fn validate_depends(
    spec: &PyodideLockSpec,
    policy: DependencyPolicy,
) -> Result<BTreeMap<String, Vec<String>>, DependencyError> {
    apply_policy(find_missing_dependencies(spec), policy)
}

/// Apply `policy` to an already computed set of missing dependencies
pub fn apply_policy(
    missing: BTreeMap<String, Vec<String>>,
    policy: DependencyPolicy,
) -> Result<BTreeMap<String, Vec<String>>, DependencyError> {
    if missing.is_empty() {
        return Ok(missing);
    }
    match policy {
        DependencyPolicy::Error => Err(DependencyError { missing }),
        DependencyPolicy::Warn => {
            for (name, deps) in &missing {
                tracing::warn!("{name} depends on missing packages: {}", deps.join(", "));
            }
            Ok(missing)
        }
        DependencyPolicy::Ignore => Ok(missing),
    }
}

/// Drop `names` from every package's `depends`
///
/// Returns the number of references removed.
pub fn remove_depends(spec: &mut PyodideLockSpec, names: &[String]) -> usize {
    let excluded: Vec<String> = names.iter().map(|n| canonicalize_name(n)).collect();
    let mut removed = 0;
    for (key, package) in &mut spec.packages {
        let before = package.depends.len();
        package
            .depends
            .retain(|dep| !excluded.contains(&canonicalize_name(dep)));
        let dropped = before - package.depends.len();
        if dropped > 0 {
            tracing::warn!("Removed {dropped} excluded dependency(ies) from {key}");
            removed += dropped;
        }
    }
    removed
}

/// Result of checking a lock spec
#[derive(Debug, Default)]
pub struct CheckResult {
    /// Packages in the lock file
    pub package_count: usize,
    /// Package key -> wheel file name mismatches
    pub wheel_mismatches: IndexMap<String, Vec<String>>,
    /// Package key -> dependencies not in the lock file
    pub missing_dependencies: BTreeMap<String, Vec<String>>,
    /// How dangling dependencies are judged
    pub policy: DependencyPolicy,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

impl CheckResult {
    /// Whether every check passed under the dependency policy
    pub fn is_valid(&self) -> bool {
        self.wheel_mismatches.is_empty()
            && (self.missing_dependencies.is_empty() || self.policy != DependencyPolicy::Error)
    }
}

/// Run every consistency check on an already validated spec
pub fn check(spec: &PyodideLockSpec, policy: DependencyPolicy) -> CheckResult {
    let mut result = CheckResult {
        package_count: spec.packages.len(),
        policy,
        ..CheckResult::default()
    };

    if let Err(e) = spec.check_wheel_filenames() {
        result.wheel_mismatches = e.mismatches;
    }

    result.missing_dependencies = find_missing_dependencies(spec);
    if policy == DependencyPolicy::Warn {
        for (name, deps) in &result.missing_dependencies {
            result
                .warnings
                .push(format!("{name} depends on missing packages: {}", deps.join(", ")));
        }
    }

    for (key, package) in &spec.packages {
        if package.shared_library {
            result.warnings.push(format!(
                "{key} uses the deprecated 'shared_library' flag; set package_type instead"
            ));
        }
        if package.sha256.is_empty() {
            result.warnings.push(format!("{key} has no sha256 checksum"));
        }
    }

    result
}
