//! `requirements.txt`-style solver inputs
//!
//! Requirements, constraints and excludes are each written as one PEP 508
//! requirement per line, keyed by canonical package name.

use std::collections::BTreeMap;

use crate::core::metadata::Requirement;
use crate::error::RequirementError;

/// Requirements keyed by canonical name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementsFile {
    specs: BTreeMap<String, String>,
}

impl RequirementsFile {
    /// Merge several sets of raw requirements
    ///
    /// Within a set specs are taken in sorted order and later sets win, so
    /// the last spec seen for a name is kept. Names present in `exclude`
    /// are left out.
    pub fn from_raw_specs(
        spec_sets: &[&[String]],
        exclude: Option<&RequirementsFile>,
    ) -> Result<Self, RequirementError> {
        let mut specs = BTreeMap::new();
        for set in spec_sets {
            let mut sorted: Vec<&String> = set.iter().collect();
            sorted.sort();
            for spec in sorted {
                let name = Requirement::parse(spec)?.canonical_name();
                if exclude.is_some_and(|ex| ex.contains(&name)) {
                    continue;
                }
                specs.insert(name, spec.clone());
            }
        }
        Ok(Self { specs })
    }

    pub fn contains(&self, canonical_name: &str) -> bool {
        self.specs.contains_key(canonical_name)
    }

    pub fn get(&self, canonical_name: &str) -> Option<&str> {
        self.specs.get(canonical_name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// File contents: the specs sorted and newline separated
    pub fn text(&self) -> String {
        let mut lines: Vec<&str> = self.specs.values().map(String::as_str).collect();
        lines.sort_unstable();
        lines.join("\n")
    }
}
