//! Wheel archives
//!
//! File-name grammar, top-level import discovery and `METADATA` access for
//! `.whl` files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use crate::core::metadata::{push_unique, WheelMetadata};
use crate::core::name::is_identifier;
use crate::core::version::Version;
use crate::error::WheelError;

/// Components of `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelFilename {
    pub name: String,
    pub version: String,
    pub build: Option<String>,
    pub python_tag: String,
    pub abi_tag: String,
    pub platform_tag: String,
}

impl WheelFilename {
    /// Parse a wheel file name
    ///
    /// A URL or path is reduced to its last segment first.
    pub fn parse(file_name: &str) -> Result<Self, WheelError> {
        let invalid = |reason: &str| WheelError::InvalidFilename {
            file_name: file_name.to_string(),
            reason: reason.to_string(),
        };

        let base = file_name.rsplit('/').next().unwrap_or(file_name);
        let stem = base
            .strip_suffix(".whl")
            .ok_or_else(|| invalid("extension must be '.whl'"))?;

        let parts: Vec<&str> = stem.split('-').collect();
        let (name, version, build, tags) = match parts.as_slice() {
            [name, version, python, abi, platform] => {
                (*name, *version, None, [*python, *abi, *platform])
            }
            [name, version, build, python, abi, platform] => {
                (*name, *version, Some(*build), [*python, *abi, *platform])
            }
            _ => return Err(invalid("wrong number of parts")),
        };

        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            return Err(invalid("invalid project name"));
        }
        if Version::parse(version).is_err() {
            return Err(invalid(&format!("invalid version '{version}'")));
        }
        if let Some(build) = build {
            if !build.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(invalid("build number must start with a digit"));
            }
        }
        if tags.iter().any(|t| t.is_empty()) {
            return Err(invalid("empty compatibility tag"));
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            build: build.map(str::to_string),
            python_tag: tags[0].to_string(),
            abi_tag: tags[1].to_string(),
            platform_tag: tags[2].to_string(),
        })
    }
}

fn check_wheel_path(path: &Path) -> Result<(), WheelError> {
    if path.extension().and_then(|e| e.to_str()) == Some("whl") {
        Ok(())
    } else {
        Err(WheelError::NotAWheel {
            path: path.to_path_buf(),
        })
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, WheelError> {
    check_wheel_path(path)?;
    let file = File::open(path).map_err(|e| WheelError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    ZipArchive::new(file).map_err(|e| WheelError::Archive {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

fn read_entry(
    archive: &mut ZipArchive<File>,
    path: &Path,
    entry: &str,
) -> Result<String, WheelError> {
    let mut file = archive.by_name(entry).map_err(|e| WheelError::Archive {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let mut text = String::new();
    file.read_to_string(&mut text).map_err(|e| WheelError::Archive {
        path: path.to_path_buf(),
        error: format!("{entry}: {e}"),
    })?;
    Ok(text)
}

/// Archive member of the form `<dist-info dir>/<file>`
fn find_dist_info_entry(names: &[String], file: &str) -> Option<String> {
    names
        .iter()
        .find(|name| {
            name.split_once('/').is_some_and(|(dir, rest)| {
                dir.ends_with(".dist-info") && rest == file
            })
        })
        .cloned()
}

fn entry_names(archive: &ZipArchive<File>) -> Vec<String> {
    archive.file_names().map(str::to_string).collect()
}

/// Importable top-level names provided by a wheel
///
/// Prefers `*.dist-info/top_level.txt`. Otherwise every root `*.py` module
/// and every root directory holding Python files counts. Returns `None` when
/// nothing importable is found.
pub fn parse_top_level_import_name(path: &Path) -> Result<Option<Vec<String>>, WheelError> {
    let mut archive = open_archive(path)?;
    let names = entry_names(&archive);

    if let Some(entry) = find_dist_info_entry(&names, "top_level.txt") {
        let text = read_entry(&mut archive, path, &entry)?;
        let mut imports = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            // Entries like `google/protobuf` name a nested package
            let root = line.split('/').next().unwrap_or(line);
            if is_identifier(root) {
                push_unique(&mut imports, root.to_string());
            }
        }
        if !imports.is_empty() {
            return Ok(Some(imports));
        }
    }

    let mut imports = Vec::new();
    for name in &names {
        let is_python = Path::new(name)
            .extension()
            .is_some_and(|ext| ext == "py" || ext == "pyc" || ext == "so");
        if !is_python {
            continue;
        }
        let top = match name.split_once('/') {
            Some((dir, _)) => {
                if dir.ends_with(".dist-info") || dir.ends_with(".data") {
                    continue;
                }
                dir
            }
            None => match name.split_once('.') {
                Some((module, _)) => module,
                None => continue,
            },
        };
        if is_identifier(top) {
            push_unique(&mut imports, top.to_string());
        }
    }

    Ok(if imports.is_empty() { None } else { Some(imports) })
}

/// Read and parse `*.dist-info/METADATA`
pub fn read_metadata(path: &Path) -> Result<WheelMetadata, WheelError> {
    let mut archive = open_archive(path)?;
    let names = entry_names(&archive);
    let display_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let entry = find_dist_info_entry(&names, "METADATA").ok_or_else(|| {
        WheelError::MissingMetadata {
            name: display_name.clone(),
        }
    })?;
    let text = read_entry(&mut archive, path, &entry)?;
    WheelMetadata::parse(&text).ok_or(WheelError::MissingMetadata { name: display_name })
}
