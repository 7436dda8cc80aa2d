//! Wheel metadata and PEP 508 requirements

use std::fmt;
use std::str::FromStr;

use crate::core::marker::{Marker, MarkerEnvironment};
use crate::core::name::canonicalize_name;
use crate::error::RequirementError;

/// A PEP 508 dependency specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Distribution name as written
    pub name: String,
    /// Requested extras (`pkg[a,b]`)
    pub extras: Vec<String>,
    /// Version specifier such as `>=1.0,<2`; empty when unconstrained
    pub specifier: String,
    /// Direct reference (`pkg @ https://...`)
    pub url: Option<String>,
    /// Environment marker after `;`
    pub marker: Option<Marker>,
    marker_text: Option<String>,
}

impl Requirement {
    /// Parse a requirement string
    pub fn parse(input: &str) -> Result<Self, RequirementError> {
        let err = |reason: &str| RequirementError {
            requirement: input.to_string(),
            reason: reason.to_string(),
        };

        let text = input.trim();
        let name_len = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(text.len());
        let name = &text[..name_len];
        if name.is_empty()
            || !name.starts_with(|c: char| c.is_ascii_alphanumeric())
            || !name.ends_with(|c: char| c.is_ascii_alphanumeric())
        {
            return Err(err("expected a package name"));
        }
        let mut rest = text[name_len..].trim_start();

        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(|| err("unclosed extras bracket"))?;
            for extra in after[..close].split(',') {
                let extra = extra.trim();
                if extra.is_empty() {
                    continue;
                }
                if !extra
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                {
                    return Err(err("invalid extra name"));
                }
                extras.push(extra.to_string());
            }
            rest = after[close + 1..].trim_start();
        }

        let mut url = None;
        let mut specifier = String::new();
        let marker_part;

        if let Some(after) = rest.strip_prefix('@') {
            let after = after.trim_start();
            // A URL ends at whitespace; the marker must be separated by one
            let end = after.find(char::is_whitespace).unwrap_or(after.len());
            let target = &after[..end];
            if target.is_empty() {
                return Err(err("expected a URL after '@'"));
            }
            url = Some(target.to_string());
            let tail = after[end..].trim_start();
            marker_part = match tail.strip_prefix(';') {
                Some(m) => Some(m),
                None if tail.is_empty() => None,
                None => return Err(err("unexpected text after URL")),
            };
        } else {
            let (spec, marker) = match rest.split_once(';') {
                Some((spec, marker)) => (spec, Some(marker)),
                None => (rest, None),
            };
            let spec = spec.trim();
            let spec = spec
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .unwrap_or(spec)
                .trim();
            if !spec.is_empty() && !spec.starts_with(['<', '>', '=', '!', '~']) {
                return Err(err("expected a version specifier"));
            }
            specifier = spec.split(',').map(str::trim).collect::<Vec<_>>().join(",");
            marker_part = marker;
        }

        let marker_text = marker_part.map(str::trim).filter(|m| !m.is_empty());
        let marker = marker_text
            .map(|m| Marker::parse(m).map_err(|e| err(&e.reason)))
            .transpose()?;

        Ok(Self {
            name: name.to_string(),
            extras,
            specifier,
            url,
            marker,
            marker_text: marker_text.map(str::to_string),
        })
    }

    /// Canonical distribution name
    pub fn canonical_name(&self) -> String {
        canonicalize_name(&self.name)
    }

    /// Whether this requirement applies in `env` when `extras` are requested
    pub fn applies(&self, env: &MarkerEnvironment, extras: &[String]) -> bool {
        self.marker
            .as_ref()
            .map_or(true, |marker| marker.evaluate(env, extras))
    }

    /// Whether the requirement is only pulled in through an extra
    pub fn is_extra_only(&self) -> bool {
        self.marker.as_ref().is_some_and(Marker::mentions_extra)
    }
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {url}")?;
            if self.marker_text.is_some() {
                write!(f, " ")?;
            }
        } else {
            write!(f, "{}", self.specifier)?;
        }
        if let Some(marker) = &self.marker_text {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

/// Core metadata from a wheel's `*.dist-info/METADATA`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WheelMetadata {
    pub name: String,
    pub version: String,
    pub requires_dist: Vec<String>,
    pub provides_extra: Vec<String>,
    pub summary: Option<String>,
}

impl WheelMetadata {
    /// Parse the RFC 822 style header block of a `METADATA` file
    ///
    /// Returns `None` when `Name` or `Version` is missing.
    pub fn parse(text: &str) -> Option<Self> {
        let mut headers: Vec<(String, String)> = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                break;
            }
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
        }

        let mut metadata = Self::default();
        for (key, value) in headers {
            match key.as_str() {
                "name" => metadata.name = value,
                "version" => metadata.version = value,
                "requires-dist" => metadata.requires_dist.push(value),
                "provides-extra" => metadata.provides_extra.push(value),
                "summary" => metadata.summary = Some(value),
                _ => {}
            }
        }

        if metadata.name.is_empty() || metadata.version.is_empty() {
            return None;
        }
        Some(metadata)
    }

    /// Parsed `Requires-Dist` entries
    pub fn requirements(&self) -> Result<Vec<Requirement>, RequirementError> {
        self.requires_dist.iter().map(|r| Requirement::parse(r)).collect()
    }

    /// Canonical names of the dependencies active in `env`
    ///
    /// Requirements gated on an `extra` are skipped.
    pub fn dependencies(&self, env: &MarkerEnvironment) -> Result<Vec<String>, RequirementError> {
        let mut depends = Vec::new();
        for req in self.requirements()? {
            if req.applies(env, &[]) {
                push_unique(&mut depends, req.canonical_name());
            }
        }
        Ok(depends)
    }

    /// Canonical names of the dependencies that `extras` add on top of
    /// [`WheelMetadata::dependencies`]
    pub fn extra_dependencies(
        &self,
        env: &MarkerEnvironment,
        extras: &[String],
    ) -> Result<Vec<String>, RequirementError> {
        let mut depends = Vec::new();
        for req in self.requirements()? {
            if req.is_extra_only() && req.applies(env, extras) && !req.applies(env, &[]) {
                push_unique(&mut depends, req.canonical_name());
            }
        }
        Ok(depends)
    }
}

pub(crate) fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
