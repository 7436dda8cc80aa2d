//! Package name normalization
//!
//! Names are compared in canonical form: lowercase, with every run of
//! `-`, `_` and `.` collapsed into a single `-`.

use regex::Regex;
use std::sync::OnceLock;

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-_.]+").expect("static regex"))
}

/// Canonicalize a distribution name (`Foo_Bar.baz` -> `foo-bar-baz`)
pub fn canonicalize_name(name: &str) -> String {
    separator_runs()
        .replace_all(name.trim(), "-")
        .to_lowercase()
}

/// Whether `name` is already in canonical form
pub fn is_canonical(name: &str) -> bool {
    canonicalize_name(name) == name
}

/// Whether `name` is a valid Python identifier, i.e. importable as a module
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}
