//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Test project context
///
/// A temporary directory with its own config directory, so the user's
/// global config never leaks into a test.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Parse a JSON file from the test project
    pub fn read_json(&self, name: &str) -> serde_json::Value {
        serde_json::from_str(&self.read_file(name)).expect("Failed to parse JSON")
    }

    /// Run `pyodide-lock` in the project directory
    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    /// Run `pyodide-lock` with extra environment variables
    pub fn run_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pyodide-lock"));
        cmd.current_dir(self.path())
            .env("PYODIDE_LOCK_CONFIG_DIR", self.path().join(".config"))
            .env_remove("UV_BIN")
            .env_remove("RUST_LOG");
        for (key, value) in envs {
            cmd.env(key, value);
        }
        for arg in args {
            cmd.arg(arg);
        }
        cmd.output().expect("Failed to execute pyodide-lock")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Combined stdout and stderr
pub fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Pure-Python test wheel
pub struct WheelBuilder {
    name: String,
    version: String,
    requires: Vec<String>,
    modules: Vec<String>,
}

impl WheelBuilder {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            requires: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn requires(mut self, requirement: &str) -> Self {
        self.requires.push(requirement.to_string());
        self
    }

    pub fn module(mut self, module: &str) -> Self {
        self.modules.push(module.to_string());
        self
    }

    fn dist_name(&self) -> String {
        self.name.replace(['-', '.'], "_")
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}-py3-none-any.whl", self.dist_name(), self.version)
    }

    /// Write the wheel into `dir` and return its path
    pub fn build(&self, dir: &Path) -> PathBuf {
        std::fs::create_dir_all(dir).expect("Failed to create wheel directory");
        let path = dir.join(self.file_name());
        let file = std::fs::File::create(&path).expect("Failed to create wheel");
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        let modules = if self.modules.is_empty() {
            vec![self.dist_name()]
        } else {
            self.modules.clone()
        };
        for module in &modules {
            zip.start_file(format!("{module}/__init__.py"), options)
                .expect("Failed to start entry");
        }

        let dist_info = format!("{}-{}.dist-info", self.dist_name(), self.version);
        let mut metadata = format!(
            "Metadata-Version: 2.1\nName: {}\nVersion: {}\n",
            self.name, self.version
        );
        for req in &self.requires {
            metadata.push_str(&format!("Requires-Dist: {req}\n"));
        }
        zip.start_file(format!("{dist_info}/METADATA"), options)
            .expect("Failed to start entry");
        zip.write_all(metadata.as_bytes())
            .expect("Failed to write METADATA");
        zip.start_file(format!("{dist_info}/WHEEL"), options)
            .expect("Failed to start entry");
        zip.write_all(b"Wheel-Version: 1.0\nRoot-Is-Purelib: true\nTag: py3-none-any\n")
            .expect("Failed to write WHEEL");
        zip.finish().expect("Failed to finish wheel");
        path
    }
}

/// SHA256 of a file
pub fn sha256_of(path: &Path) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(std::fs::read(path).expect("Failed to read file")))
}

/// A small valid lock file, as written by Python's `json.dumps`
pub const SAMPLE_LOCK: &str = r#"{"info": {"arch": "wasm32", "platform": "emscripten_3_1_58", "version": "0.27.0", "python": "3.12.1"}, "packages": {"numpy": {"name": "numpy", "version": "1.26.4", "file_name": "numpy-1.26.4-cp312-cp312-pyodide_2024_0_wasm32.whl", "install_dir": "site", "sha256": "25ebd45d3b69e8f6c6e1c9a3fb79a2ce08e970b23e63b0a1b12a9fb47f4e1b6a", "package_type": "package", "imports": ["numpy"], "depends": [], "unvendored_tests": true, "shared_library": false}, "micropip": {"name": "micropip", "version": "0.8.0", "file_name": "micropip-0.8.0-py3-none-any.whl", "install_dir": "site", "sha256": "3b3e9fd4a9c9e6d2b3bb1d3e3b7d3a6b8f1a2e6c39f0a0d51d38b9e8b7d8b7a1", "package_type": "package", "imports": ["micropip"], "depends": ["packaging"], "unvendored_tests": false, "shared_library": false}, "packaging": {"name": "packaging", "version": "24.2", "file_name": "packaging-24.2-py3-none-any.whl", "install_dir": "site", "sha256": "09abb1bccd265c01f4a3aa3f7a7db064b36514d2cba19a2f694fe6150451a759", "package_type": "package", "imports": ["packaging"], "depends": [], "unvendored_tests": false, "shared_library": false}}}"#;
