//! Lock document validation
//!
//! Walks a parsed JSON document and collects every structural problem
//! before any typed value is built, so a single run reports all of them.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::core::name::canonicalize_name;
use crate::core::version::is_valid_version;
use crate::error::{FieldViolation, SchemaError};

const ROOT_FIELDS: &[&str] = &["info", "packages"];
const INFO_FIELDS: &[&str] = &["arch", "platform", "version", "python"];
const PACKAGE_FIELDS: &[&str] = &[
    "name",
    "version",
    "file_name",
    "install_dir",
    "sha256",
    "package_type",
    "imports",
    "depends",
    "unvendored_tests",
    "shared_library",
];

/// Accepted `info.arch` values
pub const ARCH_VALUES: &[&str] = &["wasm32", "wasm64"];

/// Accepted `package_type` values
pub const PACKAGE_TYPE_VALUES: &[&str] =
    &["package", "cpython_module", "shared_library", "static_library"];

struct Validator {
    violations: Vec<FieldViolation>,
}

fn join(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Validator {
    fn report(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(path, message));
    }

    fn object<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a Map<String, Value>> {
        if let Value::Object(map) = value {
            Some(map)
        } else {
            self.report(path, format!("expected an object, found {}", type_name(value)));
            None
        }
    }

    fn unknown_fields(&mut self, path: &str, map: &Map<String, Value>, allowed: &[&str]) {
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.report(join(path, key), "unknown field");
            }
        }
    }

    /// Required-or-optional string field; `None` when absent or mistyped
    fn string<'a>(
        &mut self,
        path: &str,
        map: &'a Map<String, Value>,
        field: &str,
        required: bool,
    ) -> Option<&'a str> {
        let field_path = join(path, field);
        match map.get(field) {
            None if required => {
                self.report(field_path, "missing required field");
                None
            }
            None => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                self.report(field_path, format!("expected a string, found {}", type_name(other)));
                None
            }
        }
    }

    fn non_empty_string(&mut self, path: &str, map: &Map<String, Value>, field: &str) {
        if let Some(s) = self.string(path, map, field, true) {
            if s.trim().is_empty() {
                self.report(join(path, field), "must not be empty");
            }
        }
    }

    fn bool(&mut self, path: &str, map: &Map<String, Value>, field: &str) {
        if let Some(value) = map.get(field) {
            if !value.is_boolean() {
                self.report(
                    join(path, field),
                    format!("expected a boolean, found {}", type_name(value)),
                );
            }
        }
    }

    fn string_list(&mut self, path: &str, map: &Map<String, Value>, field: &str) {
        let field_path = join(path, field);
        match map.get(field) {
            None => {}
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        self.report(
                            format!("{field_path}[{i}]"),
                            format!("expected a string, found {}", type_name(item)),
                        );
                    }
                }
            }
            Some(other) => self.report(
                field_path,
                format!("expected an array of strings, found {}", type_name(other)),
            ),
        }
    }

    fn choice(&mut self, path: &str, map: &Map<String, Value>, field: &str, allowed: &[&str]) {
        if let Some(value) = self.string(path, map, field, false) {
            if !allowed.contains(&value) {
                self.report(
                    join(path, field),
                    format!("'{value}' is not one of: {}", allowed.join(", ")),
                );
            }
        }
    }

    fn info(&mut self, value: &Value) {
        let Some(map) = self.object("info", value) else {
            return;
        };
        self.unknown_fields("info", map, INFO_FIELDS);
        self.choice("info", map, "arch", ARCH_VALUES);
        for field in ["platform", "version", "python"] {
            self.string("info", map, field, true);
        }
    }

    fn package(&mut self, key: &str, value: &Value) {
        let path = join("packages", key);
        let Some(map) = self.object(&path, value) else {
            return;
        };
        self.unknown_fields(&path, map, PACKAGE_FIELDS);

        self.non_empty_string(&path, map, "name");
        self.non_empty_string(&path, map, "file_name");
        self.non_empty_string(&path, map, "install_dir");
        self.choice(&path, map, "package_type", PACKAGE_TYPE_VALUES);

        // Only Python distributions carry PEP 440 versions
        let is_python_package = map
            .get("package_type")
            .and_then(Value::as_str)
            .map_or(true, |t| t == "package");
        if let Some(version) = self.string(&path, map, "version", true) {
            if version.trim().is_empty() {
                self.report(join(&path, "version"), "must not be empty");
            } else if is_python_package && !is_valid_version(version) {
                self.report(
                    join(&path, "version"),
                    format!("'{version}' is not a valid version"),
                );
            }
        }

        if let Some(sha256) = self.string(&path, map, "sha256", false) {
            if !sha256.is_empty()
                && !(sha256.len() == 64 && sha256.chars().all(|c| c.is_ascii_hexdigit()))
            {
                self.report(
                    join(&path, "sha256"),
                    "expected an empty string or 64 hexadecimal characters",
                );
            }
        }

        self.string_list(&path, map, "imports");
        self.string_list(&path, map, "depends");
        self.bool(&path, map, "unvendored_tests");
        self.bool(&path, map, "shared_library");
    }

    fn packages(&mut self, value: &Value) {
        let Some(map) = self.object("packages", value) else {
            return;
        };
        let mut seen: HashMap<String, &str> = HashMap::new();
        for (key, package) in map {
            let canonical = canonicalize_name(key);
            if let Some(first) = seen.get(&canonical) {
                self.report(
                    join("packages", key),
                    format!("duplicates package '{first}' (both normalize to '{canonical}')"),
                );
            } else {
                seen.insert(canonical, key);
            }
            self.package(key, package);
        }
    }
}

/// Validate a lock document, collecting every violation
pub fn validate(document: &Value, source_name: &str) -> Result<(), SchemaError> {
    let mut validator = Validator {
        violations: Vec::new(),
    };

    if let Some(root) = validator.object("", document) {
        validator.unknown_fields("", root, ROOT_FIELDS);
        for field in ROOT_FIELDS {
            match root.get(*field) {
                None => validator.report(*field, "missing required field"),
                Some(value) if *field == "info" => validator.info(value),
                Some(value) => validator.packages(value),
            }
        }
    }

    if validator.violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError {
            source_name: source_name.to_string(),
            violations: validator.violations,
        })
    }
}

/// JSON Schema (draft 2019-09) describing `pyodide-lock.json`
pub fn json_schema() -> Value {
    let string_list = json!({"type": "array", "items": {"type": "string"}, "default": []});
    json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "$id": "https://pyodide.org/schema/pyodide-lock.json",
        "title": "PyodideLockSpec",
        "description": "A specification for the pyodide-lock.json file.",
        "type": "object",
        "required": ["info", "packages"],
        "additionalProperties": false,
        "properties": {
            "info": {"$ref": "#/definitions/InfoSpec"},
            "packages": {
                "type": "object",
                "additionalProperties": {"$ref": "#/definitions/PackageSpec"}
            }
        },
        "definitions": {
            "InfoSpec": {
                "description": "Runtime the lock file targets.",
                "type": "object",
                "required": ["platform", "version", "python"],
                "additionalProperties": false,
                "properties": {
                    "arch": {"enum": ARCH_VALUES, "default": "wasm32"},
                    "platform": {"type": "string"},
                    "version": {"type": "string"},
                    "python": {"type": "string"}
                }
            },
            "PackageSpec": {
                "description": "A single package entry.",
                "type": "object",
                "required": ["name", "version", "file_name", "install_dir"],
                "additionalProperties": false,
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "version": {"type": "string", "minLength": 1},
                    "file_name": {"type": "string", "minLength": 1},
                    "install_dir": {"type": "string", "minLength": 1},
                    "sha256": {"type": "string", "pattern": "^([0-9a-fA-F]{64})?$", "default": ""},
                    "package_type": {"enum": PACKAGE_TYPE_VALUES, "default": "package"},
                    "imports": string_list.clone(),
                    "depends": string_list,
                    "unvendored_tests": {"type": "boolean", "default": false},
                    "shared_library": {"type": "boolean", "default": false, "deprecated": true}
                }
            }
        }
    })
}
