//! Test utilities
//!
//! Proptest generators and an in-memory wheel builder.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a canonical package name (lowercase alphanumeric with hyphens)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,10}(-[a-z0-9]{1,8}){0,2}"
    }

    /// Generate a PEP 440 version, optionally with a pre/post/dev suffix
    pub fn pep440_version() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(0u32..100, 1..4),
            prop_oneof![
                Just(String::new()),
                (1u32..5).prop_map(|n| format!("a{n}")),
                (1u32..5).prop_map(|n| format!("rc{n}")),
                (1u32..5).prop_map(|n| format!(".post{n}")),
                (0u32..5).prop_map(|n| format!(".dev{n}")),
            ],
        )
            .prop_map(|(release, suffix)| {
                let release: Vec<String> = release.iter().map(ToString::to_string).collect();
                format!("{}{suffix}", release.join("."))
            })
    }

    /// Generate a valid SHA256 hash (64 hex characters)
    pub fn sha256_hash() -> impl Strategy<Value = String> {
        "[0-9a-f]{64}"
    }

    /// Generate a wheel URL
    pub fn wheel_url() -> impl Strategy<Value = String> {
        (
            prop_oneof!["https", "http"],
            "[a-z]{3,10}",
            "[a-z]{2,5}",
            package_name(),
        )
            .prop_map(|(scheme, domain, tld, name)| {
                format!(
                    "{scheme}://{domain}.{tld}/{}-1.0-py3-none-any.whl",
                    name.replace('-', "_")
                )
            })
    }
}

#[cfg(test)]
pub mod wheel {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Write a zip archive holding `entries` (member name, content)
    pub fn write_wheel(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).expect("create wheel");
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).expect("start entry");
            zip.write_all(content.as_bytes()).expect("write entry");
        }
        zip.finish().expect("finish wheel");
    }

    /// Builder for pure-Python test wheels with real `METADATA`
    #[derive(Debug, Clone)]
    pub struct TestWheel {
        name: String,
        version: String,
        modules: Vec<String>,
        requires: Vec<String>,
        optional: Vec<(String, Vec<String>)>,
    }

    impl TestWheel {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                modules: Vec::new(),
                requires: Vec::new(),
                optional: Vec::new(),
            }
        }

        pub fn version(mut self, version: &str) -> Self {
            self.version = version.to_string();
            self
        }

        /// Add a top-level `<module>.py`
        pub fn module(mut self, module: &str) -> Self {
            self.modules.push(module.to_string());
            self
        }

        pub fn requires(mut self, requirement: &str) -> Self {
            self.requires.push(requirement.to_string());
            self
        }

        /// Declare an extra and its requirements
        pub fn optional(mut self, extra: &str, requirements: &[&str]) -> Self {
            self.optional.push((
                extra.to_string(),
                requirements.iter().map(|r| (*r).to_string()).collect(),
            ));
            self
        }

        pub fn file_name(&self) -> String {
            format!("{}-{}-py3-none-any.whl", self.dist_name(), self.version)
        }

        fn dist_name(&self) -> String {
            self.name.replace(['-', '.'], "_")
        }

        fn metadata(&self) -> String {
            let mut text = format!(
                "Metadata-Version: 2.1\nName: {}\nVersion: {}\nSummary: {} example package\n",
                self.name, self.version, self.name
            );
            for req in &self.requires {
                text.push_str(&format!("Requires-Dist: {req}\n"));
            }
            for (extra, reqs) in &self.optional {
                text.push_str(&format!("Provides-Extra: {extra}\n"));
                for req in reqs {
                    text.push_str(&format!("Requires-Dist: {req} ; extra == \"{extra}\"\n"));
                }
            }
            text
        }

        /// Write the wheel into `dir` and return its path
        pub fn build(&self, dir: &Path) -> PathBuf {
            let dist_info = format!("{}-{}.dist-info", self.dist_name(), self.version);
            let modules = if self.modules.is_empty() {
                vec![self.dist_name()]
            } else {
                self.modules.clone()
            };

            let mut entries: Vec<(String, String)> = modules
                .iter()
                .map(|m| (format!("{m}.py"), String::new()))
                .collect();
            entries.push((format!("{dist_info}/METADATA"), self.metadata()));
            entries.push((
                format!("{dist_info}/WHEEL"),
                "Wheel-Version: 1.0\nRoot-Is-Purelib: true\nTag: py3-none-any\n".to_string(),
            ));

            let path = dir.join(self.file_name());
            let borrowed: Vec<(&str, &str)> = entries
                .iter()
                .map(|(n, c)| (n.as_str(), c.as_str()))
                .collect();
            write_wheel(&path, &borrowed);
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::core::version::is_valid_version;
    use crate::core::wheel::WheelFilename;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_pep440_version_generator(version in pep440_version()) {
            prop_assert!(is_valid_version(&version));
        }

        #[test]
        fn test_sha256_hash_generator(hash in sha256_hash()) {
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        }

        #[test]
        fn test_wheel_url_generator(url in wheel_url()) {
            prop_assert!(WheelFilename::parse(&url).is_ok());
        }
    }
}
