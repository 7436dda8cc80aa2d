//! Lock spec data model
//!
//! `pyodide-lock.json` records the runtime it targets (`info`) and every
//! package available to it (`packages`), keyed by package name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::config::defaults;
use crate::core::marker::MarkerEnvironment;
use crate::core::name::canonicalize_name;
use crate::core::version::canonicalize_version;
use crate::core::wheel::{self, parse_top_level_import_name, WheelFilename};
use crate::core::{schema, serialize};
use crate::error::{ConsistencyError, FieldViolation, LockError, SchemaError, WheelError};
use crate::infra::filesystem;

/// Target WebAssembly architecture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    #[default]
    Wasm32,
    Wasm64,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wasm32 => "wasm32",
            Self::Wasm64 => "wasm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of artifact a package entry refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    #[default]
    Package,
    CpythonModule,
    SharedLibrary,
    StaticLibrary,
}

/// Runtime the lock file targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfoSpec {
    #[serde(default)]
    pub arch: Arch,
    /// Emscripten platform, e.g. `emscripten_3_1_39`
    pub platform: String,
    /// Runtime version
    pub version: String,
    /// Python version, e.g. `3.11.3`
    pub python: String,
}

impl InfoSpec {
    pub fn new(
        platform: impl Into<String>,
        version: impl Into<String>,
        python: impl Into<String>,
    ) -> Self {
        Self {
            arch: Arch::default(),
            platform: platform.into(),
            version: version.into(),
            python: python.into(),
        }
    }
}

/// A single package entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    /// Artifact file name, relative to the lock file or an absolute URL
    pub file_name: String,
    pub install_dir: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub package_type: PackageType,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub unvendored_tests: bool,
    /// Deprecated; use `package_type = shared_library`
    #[serde(default)]
    pub shared_library: bool,
}

impl PackageSpec {
    /// Entry with defaults for everything but the required fields
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        file_name: impl Into<String>,
        install_dir: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            file_name: file_name.into(),
            install_dir: install_dir.into(),
            sha256: String::new(),
            package_type: PackageType::Package,
            imports: Vec::new(),
            depends: Vec::new(),
            unvendored_tests: false,
            shared_library: false,
        }
    }

    /// Build an entry from a wheel on disk
    ///
    /// Only `Requires-Dist` entries whose markers hold in `env` become
    /// `depends`; requirements behind an extra are left out.
    pub fn from_wheel(path: &Path, env: &MarkerEnvironment) -> Result<Self, WheelError> {
        let metadata = wheel::read_metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sha256 = filesystem::sha256_file(path).map_err(|e| WheelError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut spec = Self::new(
            canonicalize_name(&metadata.name),
            metadata.version.clone(),
            file_name,
            defaults::DEFAULT_INSTALL_DIR,
        );
        spec.sha256 = sha256;
        spec.imports = parse_top_level_import_name(path)?.unwrap_or_default();
        spec.depends = metadata.dependencies(env)?;
        Ok(spec)
    }

    /// Recompute `sha256` from the artifact at `path`
    pub fn update_sha256(&mut self, path: &Path) -> Result<&mut Self, LockError> {
        self.sha256 = filesystem::sha256_file(path).map_err(|e| LockError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(self)
    }

    /// Whether `file_name` is an absolute URL rather than a relative path
    pub fn is_remote(&self) -> bool {
        self.file_name.contains("://")
    }

    /// Problems between the wheel file name and `name`/`version`
    ///
    /// Entries that are not wheels have none.
    pub fn wheel_filename_mismatches(&self) -> Vec<String> {
        if !self.file_name.ends_with(".whl") {
            return Vec::new();
        }
        let parsed = match WheelFilename::parse(&self.file_name) {
            Ok(parsed) => parsed,
            Err(e) => return vec![e.to_string()],
        };

        let mut errors = Vec::new();
        if canonicalize_name(&parsed.name) != canonicalize_name(&self.name) {
            errors.push(format!(
                "Package name in wheel filename '{}' does not match '{}'",
                parsed.name, self.name
            ));
        }
        let wheel_version = canonicalize_version(&parsed.version);
        let package_version = canonicalize_version(&self.version);
        if wheel_version != package_version {
            errors.push(format!(
                "Version in the wheel filename '{wheel_version}' does not match \
                 package version '{package_version}'"
            ));
        }
        errors
    }
}

/// A specification for the `pyodide-lock.json` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PyodideLockSpec {
    pub info: InfoSpec,
    pub packages: IndexMap<String, PackageSpec>,
}

impl PyodideLockSpec {
    /// Empty lock spec for the given runtime
    pub fn new(info: InfoSpec) -> Self {
        Self {
            info,
            packages: IndexMap::new(),
        }
    }

    /// Read and validate a lock file
    pub fn from_json(path: &Path) -> Result<Self, LockError> {
        let text = std::fs::read_to_string(path).map_err(|e| LockError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse and validate a lock document held in memory
    pub fn from_json_str(text: &str) -> Result<Self, LockError> {
        Self::parse(text, "<string>")
    }

    fn parse(text: &str, source_name: &str) -> Result<Self, LockError> {
        let value: Value = serde_json::from_str(text).map_err(|e| LockError::Json {
            source_name: source_name.to_string(),
            error: e.to_string(),
        })?;
        Ok(Self::from_named_value(value, source_name)?)
    }

    /// Validate an already parsed document
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        Self::from_named_value(value, "<document>")
    }

    fn from_named_value(value: Value, source_name: &str) -> Result<Self, SchemaError> {
        schema::validate(&value, source_name)?;
        serde_json::from_value(value).map_err(|e| SchemaError {
            source_name: source_name.to_string(),
            violations: vec![FieldViolation::new("", e.to_string())],
        })
    }

    /// Serialize in canonical form
    pub fn to_json_string(&self, indent: Option<usize>) -> Result<String, LockError> {
        serialize::to_string(self, indent).map_err(|e| LockError::Json {
            source_name: "<output>".to_string(),
            error: e.to_string(),
        })
    }

    /// Write the lock spec to `path`
    pub fn to_json(&self, path: &Path, indent: Option<usize>) -> Result<(), LockError> {
        let text = self.to_json_string(indent)?;
        filesystem::write_atomic(path, text.as_bytes())?;
        Ok(())
    }

    /// Check that package names and versions agree with wheel file names
    pub fn check_wheel_filenames(&self) -> Result<(), ConsistencyError> {
        let mismatches: IndexMap<String, Vec<String>> = self
            .packages
            .iter()
            .filter_map(|(key, spec)| {
                let errors = spec.wheel_filename_mismatches();
                (!errors.is_empty()).then(|| (key.clone(), errors))
            })
            .collect();

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(ConsistencyError { mismatches })
        }
    }

    /// Map key under which `name` is stored, comparing canonical names
    pub fn package_key(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.packages.get_key_value(name) {
            return Some(key.as_str());
        }
        let canonical = canonicalize_name(name);
        self.packages
            .keys()
            .find(|key| canonicalize_name(key) == canonical)
            .map(String::as_str)
    }

    pub fn get_package(&self, name: &str) -> Option<&PackageSpec> {
        let key = self.package_key(name)?.to_string();
        self.packages.get(&key)
    }

    pub fn get_package_mut(&mut self, name: &str) -> Option<&mut PackageSpec> {
        let key = self.package_key(name)?.to_string();
        self.packages.get_mut(&key)
    }

    pub fn contains_package(&self, name: &str) -> bool {
        self.package_key(name).is_some()
    }

    /// Insert or replace an entry, returning the previous one
    ///
    /// A replacement keeps the existing key and map position; new entries
    /// are appended under their canonical name.
    pub fn insert_package(&mut self, spec: PackageSpec) -> Option<PackageSpec> {
        let key = self
            .package_key(&spec.name)
            .map_or_else(|| canonicalize_name(&spec.name), str::to_string);
        self.packages.insert(key, spec)
    }

    /// Remove an entry, keeping the order of the remaining ones
    pub fn remove_package(&mut self, name: &str) -> Option<PackageSpec> {
        let key = self.package_key(name)?.to_string();
        self.packages.shift_remove(&key)
    }

    /// Marker environment of the runtime this lock file targets
    pub fn marker_environment(&self) -> MarkerEnvironment {
        MarkerEnvironment::from_info(&self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::wheel::write_wheel;
    use tempfile::TempDir;

    const LOCK_EXAMPLE: &str = r#"{"info": {"arch": "wasm32", "platform": "emscripten_3_1_39", "version": "0.24.0.dev0", "python": "3.11.3"}, "packages": {"numpy": {"name": "numpy", "version": "1.24.3", "file_name": "numpy-1.24.3-cp311-cp311-emscripten_3_1_39_wasm32.whl", "install_dir": "site", "sha256": "513af43ffb1f7d507c8d879c9f7e5d6c789ad21b6a67e5bca1d7cfb86bf8640f", "package_type": "package", "imports": ["numpy"], "depends": [], "unvendored_tests": false, "shared_library": false}}}"#;

    fn example() -> PyodideLockSpec {
        PyodideLockSpec::from_json_str(LOCK_EXAMPLE).unwrap()
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let spec = example();
        assert_eq!(spec.to_json_string(None).unwrap(), LOCK_EXAMPLE);
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let text = r#"{"info": {"platform": "emscripten_3_1_39", "version": "0.24.0", "python": "3.11.3"},
            "packages": {"six": {"name": "six", "version": "1.16.0",
            "file_name": "six-1.16.0-py2.py3-none-any.whl", "install_dir": "site"}}}"#;
        let spec = PyodideLockSpec::from_json_str(text).unwrap();
        assert_eq!(spec.info.arch, Arch::Wasm32);
        let six = &spec.packages["six"];
        assert_eq!(six.sha256, "");
        assert_eq!(six.package_type, PackageType::Package);
        assert!(six.imports.is_empty());
        assert!(!six.unvendored_tests);
        assert!(spec.to_json_string(None).unwrap().contains(r#""shared_library": false"#));
    }

    #[test]
    fn test_to_json_indent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pyodide-lock.json");
        let spec = example();

        spec.to_json(&path, None).unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().contains('\n'));

        spec.to_json(&path, Some(0)).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains('\n'));

        spec.to_json(&path, Some(2)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"info\": {"));
        assert_eq!(PyodideLockSpec::from_json(&path).unwrap(), spec);
    }

    #[test]
    fn test_invalid_json_reports_source() {
        let err = PyodideLockSpec::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, LockError::Json { .. }));
        assert!(err.to_string().contains("<string>"));
    }

    #[test]
    fn test_missing_file() {
        let err = PyodideLockSpec::from_json(Path::new("/nonexistent/pyodide-lock.json"))
            .unwrap_err();
        assert!(matches!(err, LockError::Io { .. }));
    }

    #[test]
    fn test_check_wheel_filenames() {
        let mut spec = example();
        assert!(spec.check_wheel_filenames().is_ok());

        spec.packages["numpy"].name = "numpy2".to_string();
        let err = spec.check_wheel_filenames().unwrap_err();
        assert_eq!(
            err.to_string(),
            "check_wheel_filenames failed:\n  - numpy:\n    - \
             Package name in wheel filename 'numpy' does not match 'numpy2'"
        );

        spec.packages["numpy"].version = "0.2.3".to_string();
        let err = spec.check_wheel_filenames().unwrap_err();
        assert_eq!(err.mismatches["numpy"].len(), 2);
        assert!(err.to_string().ends_with(
            "Version in the wheel filename '1.24.3' does not match package version '0.2.3'"
        ));
    }

    #[test]
    fn test_check_wheel_filenames_normalizes() {
        let mut spec = example();
        spec.insert_package(PackageSpec::new(
            "ruamel.yaml",
            "0.17.0",
            "ruamel.yaml-0.17-py3-none-any.whl",
            "site",
        ));
        spec.insert_package(PackageSpec::new("openssl", "1.1.1n", "openssl-1.1.1n.zip", "dynlib"));
        assert!(spec.check_wheel_filenames().is_ok());

        spec.insert_package(PackageSpec::new("bar", "1.0", "foo-1.0-py3-none-any.whl", "site"));
        let err = spec.check_wheel_filenames().unwrap_err();
        assert_eq!(err.mismatches.len(), 1);
        assert_eq!(err.mismatches["bar"].len(), 1);
    }

    #[test]
    fn test_name_mismatch_quotes_wheel_name_as_written() {
        let mut spec = example();
        spec.insert_package(PackageSpec::new(
            "other",
            "1.0",
            "Ruamel.Yaml-1.0-py3-none-any.whl",
            "site",
        ));
        let err = spec.check_wheel_filenames().unwrap_err();
        assert_eq!(
            err.mismatches["other"],
            vec!["Package name in wheel filename 'Ruamel.Yaml' does not match 'other'"]
        );
    }

    #[test]
    fn test_unparsable_wheel_name_is_a_mismatch() {
        let mut spec = example();
        spec.insert_package(PackageSpec::new("odd", "1.0", "odd-1.0.whl", "site"));
        let err = spec.check_wheel_filenames().unwrap_err();
        assert!(err.mismatches["odd"][0].contains("Invalid wheel filename"));
    }

    #[test]
    fn test_lookup_and_insert_by_canonical_name() {
        let mut spec = example();
        spec.insert_package(PackageSpec::new(
            "Py_One",
            "0.1.0",
            "py_one-0.1.0-py3-none-any.whl",
            "site",
        ));
        spec.insert_package(PackageSpec::new("zzz", "1.0", "zzz-1.0-py3-none-any.whl", "site"));
        assert!(spec.packages.contains_key("py-one"));
        assert!(spec.get_package("py.one").is_some());

        // Replacing keeps the original position
        let old = spec.insert_package(PackageSpec::new(
            "py-one",
            "0.2.0",
            "py_one-0.2.0-py3-none-any.whl",
            "site",
        ));
        assert_eq!(old.unwrap().version, "0.1.0");
        let keys: Vec<_> = spec.packages.keys().cloned().collect();
        assert_eq!(keys, vec!["numpy", "py-one", "zzz"]);

        assert!(spec.remove_package("PY_ONE").is_some());
        let keys: Vec<_> = spec.packages.keys().cloned().collect();
        assert_eq!(keys, vec!["numpy", "zzz"]);
    }

    #[test]
    fn test_update_sha256() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        std::fs::write(&path, "foo").unwrap();
        let mut spec = example();
        let numpy = spec.get_package_mut("numpy").unwrap();
        numpy.sha256 = "0".to_string();
        numpy.update_sha256(&path).unwrap();
        assert_eq!(
            numpy.sha256,
            "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae"
        );
    }

    #[test]
    fn test_from_wheel() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("needs_one-0.1.0-py3-none-any.whl");
        write_wheel(
            &path,
            &[
                ("needs_one/__init__.py", ""),
                (
                    "needs_one-0.1.0.dist-info/METADATA",
                    "Name: needs_one\nVersion: 0.1.0\nRequires-Dist: py_one\n\
                     Requires-Dist: winonly ; sys_platform == \"win32\"\n\
                     Requires-Dist: docs ; extra == \"docs\"\n",
                ),
            ],
        );
        let spec = PackageSpec::from_wheel(&path, &example().marker_environment()).unwrap();
        assert_eq!(spec.name, "needs-one");
        assert_eq!(spec.version, "0.1.0");
        assert_eq!(spec.file_name, "needs_one-0.1.0-py3-none-any.whl");
        assert_eq!(spec.install_dir, "site");
        assert_eq!(spec.imports, vec!["needs_one"]);
        assert_eq!(spec.depends, vec!["py-one"]);
        assert_eq!(spec.sha256.len(), 64);
    }

    #[test]
    fn test_from_wheel_rejects_non_wheel() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pkg.zip");
        write_wheel(&path, &[("README.md", "#")]);
        let err = PackageSpec::from_wheel(&path, &example().marker_environment()).unwrap_err();
        assert!(err.to_string().contains("not a wheel"));
    }
}
