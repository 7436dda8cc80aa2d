//! Package versions
//!
//! Python package versions follow PEP 440, not semver: `0.24.0.dev0`,
//! `2023.3`, `1.0rc1` and `1!2.0+local.7` are all valid. This module
//! parses them, renders the normalized and canonical forms, and orders them.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors related to version parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// String is not a PEP 440 version
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}

/// Pre-release phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    Rc,
}

impl PreRelease {
    fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Rc => "rc",
        }
    }
}

/// A segment of a local version label (`+ubuntu.1`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocalSegment {
    // Alphanumeric segments sort before numeric ones.
    Alpha(String),
    Number(u64),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A parsed PEP 440 version
#[derive(Debug, Clone)]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreRelease, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<Vec<LocalSegment>>,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)^\s*
            v?
            (?:(?P<epoch>[0-9]+)!)?
            (?P<release>[0-9]+(?:\.[0-9]+)*)
            (?P<pre>[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>[0-9]+)?)?
            (?P<post>(?:-(?P<post_n1>[0-9]+))|(?:[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?))?
            (?P<dev>[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
            (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
            \s*$",
        )
        .expect("static regex")
    })
}

fn parse_number(input: &str, digits: &str) -> Result<u64, VersionError> {
    digits.parse::<u64>().map_err(|e| VersionError::InvalidVersion {
        version: input.to_string(),
        reason: e.to_string(),
    })
}

impl Version {
    /// Parse a PEP 440 version string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let caps = version_regex()
            .captures(input)
            .ok_or_else(|| VersionError::InvalidVersion {
                version: input.to_string(),
                reason: "not a PEP 440 version".to_string(),
            })?;

        let epoch = match caps.name("epoch") {
            Some(m) => parse_number(input, m.as_str())?,
            None => 0,
        };

        let release = caps["release"]
            .split('.')
            .map(|part| parse_number(input, part))
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let phase = match label.as_str().to_lowercase().as_str() {
                    "a" | "alpha" => PreRelease::Alpha,
                    "b" | "beta" => PreRelease::Beta,
                    _ => PreRelease::Rc,
                };
                let n = match caps.name("pre_n") {
                    Some(m) => parse_number(input, m.as_str())?,
                    None => 0,
                };
                Some((phase, n))
            }
            None => None,
        };

        let post = if caps.name("post").is_some() {
            let digits = caps.name("post_n1").or_else(|| caps.name("post_n2"));
            Some(match digits {
                Some(m) => parse_number(input, m.as_str())?,
                None => 0,
            })
        } else {
            None
        };

        let dev = if caps.name("dev").is_some() {
            Some(match caps.name("dev_n") {
                Some(m) => parse_number(input, m.as_str())?,
                None => 0,
            })
        } else {
            None
        };

        let local = caps.name("local").map(|m| {
            m.as_str()
                .split(['-', '_', '.'])
                .map(|seg| match seg.parse::<u64>() {
                    Ok(n) => LocalSegment::Number(n),
                    Err(_) => LocalSegment::Alpha(seg.to_lowercase()),
                })
                .collect()
        });

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// `major.minor` of the release (`3.11.3` -> `3.11`)
    pub fn major_minor(&self) -> String {
        let major = self.release.first().copied().unwrap_or(0);
        let minor = self.release.get(1).copied().unwrap_or(0);
        format!("{major}.{minor}")
    }

    /// Version without its local label
    pub fn public(&self) -> Self {
        Self {
            local: None,
            ..self.clone()
        }
    }

    /// Canonical form with trailing zero release segments removed
    ///
    /// `1.0.0` and `1.0` both become `1`; used to compare versions textually.
    pub fn canonical(&self) -> String {
        let mut release = self.release.clone();
        while release.len() > 1 && release.last() == Some(&0) {
            release.pop();
        }
        Self {
            release,
            ..self.clone()
        }
        .to_string()
    }

    fn trimmed_release(&self) -> &[u64] {
        let mut end = self.release.len();
        while end > 0 && self.release[end - 1] == 0 {
            end -= 1;
        }
        &self.release[..end]
    }

    fn sort_key(&self) -> SortKey<'_> {
        let pre = match (self.pre, self.post, self.dev) {
            // A bare dev release sorts before every pre-release of the same version.
            (None, None, Some(_)) => PreKey::Min,
            (Some((phase, n)), _, _) => PreKey::Pre(phase, n),
            (None, _, _) => PreKey::Max,
        };
        let dev = match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Max,
        };
        SortKey {
            epoch: self.epoch,
            release: self.trimmed_release(),
            pre,
            post: self.post,
            dev,
            local: self.local.as_deref(),
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    Min,
    Pre(PreRelease, u64),
    Max,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    Max,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct SortKey<'a> {
    epoch: u64,
    release: &'a [u64],
    pre: PreKey,
    post: Option<u64>,
    dev: DevKey,
    local: Option<&'a [LocalSegment]>,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        f.write_str(&release.join("."))?;
        if let Some((phase, n)) = self.pre {
            write!(f, "{}{n}", phase.as_str())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if let Some(local) = &self.local {
            let segments: Vec<String> = local.iter().map(ToString::to_string).collect();
            write!(f, "+{}", segments.join("."))?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse and validate a version string
pub fn parse_version(version: &str) -> Result<Version, VersionError> {
    Version::parse(version)
}

/// Whether `version` is a valid PEP 440 version
pub fn is_valid_version(version: &str) -> bool {
    Version::parse(version).is_ok()
}

/// Canonical form of a version string, or the trimmed input if it does not parse
pub fn canonicalize_version(version: &str) -> String {
    match Version::parse(version) {
        Ok(v) => v.canonical(),
        Err(_) => version.trim().to_string(),
    }
}

/// Compare two versions
pub fn compare_versions(v1: &str, v2: &str) -> Result<Ordering, VersionError> {
    Ok(parse_version(v1)?.cmp(&parse_version(v2)?))
}
