//! `pylock.toml` (PEP 751) as written by the solver
//!
//! Only the fields needed to locate each package's wheel are read.

use serde::Deserialize;

use crate::core::name::canonicalize_name;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Hashes {
    pub sha256: Option<String>,
}

/// Single artifact of a package (`archive` table)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Archive {
    pub url: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub hashes: Hashes,
}

/// One entry of a package's `wheels` array
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LockedWheel {
    pub name: Option<String>,
    pub url: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub hashes: Hashes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: Option<String>,
    pub archive: Option<Archive>,
    #[serde(default)]
    pub wheels: Vec<LockedWheel>,
}

/// Where a solved package's wheel comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WheelSource {
    /// File on disk, relative to the solver's working directory
    Path(String),
    /// Remote wheel with its expected hash
    Url { url: String, sha256: Option<String> },
}

impl LockedPackage {
    pub fn canonical_name(&self) -> String {
        canonicalize_name(&self.name)
    }

    /// The artifact to install: `archive` first, then the first wheel
    pub fn source(&self) -> Option<WheelSource> {
        if let Some(archive) = &self.archive {
            if let Some(path) = &archive.path {
                return Some(WheelSource::Path(path.clone()));
            }
            if let Some(url) = &archive.url {
                return Some(WheelSource::Url {
                    url: url.clone(),
                    sha256: archive.hashes.sha256.clone(),
                });
            }
        }
        let wheel = self.wheels.first()?;
        if let Some(url) = &wheel.url {
            return Some(WheelSource::Url {
                url: url.clone(),
                sha256: wheel.hashes.sha256.clone(),
            });
        }
        wheel.path.clone().map(WheelSource::Path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PyLock {
    #[serde(rename = "lock-version")]
    pub lock_version: Option<String>,
    #[serde(default)]
    pub packages: Vec<LockedPackage>,
}

impl PyLock {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
