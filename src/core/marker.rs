//! Environment markers
//!
//! Evaluates PEP 508 markers such as
//! `python_version >= "3.8" and sys_platform != "win32"` against the
//! runtime a lock file targets.

use std::cmp::Ordering;

use crate::core::name::canonicalize_name;
use crate::core::spec::InfoSpec;
use crate::core::version::Version;
use crate::error::RequirementError;

/// Marker variables describing the runtime a lock file targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEnvironment {
    pub implementation_name: String,
    pub implementation_version: String,
    pub os_name: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub python_full_version: String,
    pub python_version: String,
    pub sys_platform: String,
}

impl MarkerEnvironment {
    /// Environment of the Pyodide runtime described by `info`
    ///
    /// `platform` carries the emscripten version (`emscripten_3_1_39`), which
    /// becomes `platform_release = "3.1.39"`.
    pub fn from_info(info: &InfoSpec) -> Self {
        let platform_release = info
            .platform
            .strip_prefix("emscripten_")
            .unwrap_or(&info.platform)
            .replace('_', ".");
        let python_version = Version::parse(&info.python).map_or_else(
            |_| info.python.split('.').take(2).collect::<Vec<_>>().join("."),
            |v| v.major_minor(),
        );

        Self {
            implementation_name: "cpython".to_string(),
            implementation_version: info.python.clone(),
            os_name: "posix".to_string(),
            platform_machine: info.arch.as_str().to_string(),
            platform_python_implementation: "CPython".to_string(),
            platform_release,
            platform_system: "Emscripten".to_string(),
            platform_version: "#1".to_string(),
            python_full_version: info.python.clone(),
            python_version,
            sys_platform: "emscripten".to_string(),
        }
    }

    /// Value of a marker variable, if it is one this environment defines
    pub fn get(&self, variable: &str) -> Option<&str> {
        let value = match variable {
            "implementation_name" => &self.implementation_name,
            "implementation_version" => &self.implementation_version,
            "os_name" | "os.name" => &self.os_name,
            "platform_machine" | "platform.machine" => &self.platform_machine,
            "platform_python_implementation" | "platform.python_implementation" => {
                &self.platform_python_implementation
            }
            "platform_release" => &self.platform_release,
            "platform_system" => &self.platform_system,
            "platform_version" | "platform.version" => &self.platform_version,
            "python_full_version" => &self.python_full_version,
            "python_version" => &self.python_version,
            "sys_platform" | "sys.platform" => &self.sys_platform,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// Comparison operator in a marker expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Compatible,
    Arbitrary,
    In,
    NotIn,
}

/// One side of a marker comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    Variable(String),
    Literal(String),
}

/// A parsed marker expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Compare {
        lhs: MarkerValue,
        op: MarkerOp,
        rhs: MarkerValue,
    },
    All(Vec<Marker>),
    Any(Vec<Marker>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Op(MarkerOp),
    And,
    Or,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| "unterminated string".to_string())?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '=' | '!' | '<' | '>' | '~' => {
                let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
                let (op, len) = if rest.starts_with("===") {
                    (MarkerOp::Arbitrary, 3)
                } else if rest.starts_with("==") {
                    (MarkerOp::Equal, 2)
                } else if rest.starts_with("!=") {
                    (MarkerOp::NotEqual, 2)
                } else if rest.starts_with("<=") {
                    (MarkerOp::LessEqual, 2)
                } else if rest.starts_with(">=") {
                    (MarkerOp::GreaterEqual, 2)
                } else if rest.starts_with("~=") {
                    (MarkerOp::Compatible, 2)
                } else if rest.starts_with('<') {
                    (MarkerOp::Less, 1)
                } else if rest.starts_with('>') {
                    (MarkerOp::Greater, 1)
                } else {
                    return Err(format!("unexpected operator '{rest}'"));
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while chars
                    .get(i)
                    .is_some_and(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "in" => tokens.push(Token::Op(MarkerOp::In)),
                    "not" => {
                        // `not` only appears as part of `not in`
                        let mut j = i;
                        while chars.get(j).is_some_and(|ch| ch.is_whitespace()) {
                            j += 1;
                        }
                        let next: String = chars[j..chars.len().min(j + 2)].iter().collect();
                        let after = chars.get(j + 2);
                        if next == "in" && after.map_or(true, |ch| !ch.is_alphanumeric()) {
                            tokens.push(Token::Op(MarkerOp::NotIn));
                            i = j + 2;
                        } else {
                            return Err("expected 'in' after 'not'".to_string());
                        }
                    }
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Marker, String> {
        let mut items = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Marker::Any(items)
        })
    }

    fn parse_and(&mut self) -> Result<Marker, String> {
        let mut items = vec![self.parse_atom()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            items.push(self.parse_atom()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Marker::All(items)
        })
    }

    fn parse_atom(&mut self) -> Result<Marker, String> {
        if self.peek() == Some(&Token::Open) {
            self.pos += 1;
            let inner = self.parse_or()?;
            return match self.next() {
                Some(Token::Close) => Ok(inner),
                _ => Err("expected ')'".to_string()),
            };
        }
        let lhs = self.parse_value()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            _ => return Err("expected a comparison operator".to_string()),
        };
        let rhs = self.parse_value()?;
        Ok(Marker::Compare { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<MarkerValue, String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(MarkerValue::Variable(name)),
            Some(Token::Str(s)) => Ok(MarkerValue::Literal(s)),
            _ => Err("expected a marker variable or quoted string".to_string()),
        }
    }
}

impl Marker {
    /// Parse a marker expression
    pub fn parse(input: &str) -> Result<Self, RequirementError> {
        let err = |reason: String| RequirementError {
            requirement: input.to_string(),
            reason,
        };
        let tokens = tokenize(input).map_err(err)?;
        let mut parser = Parser { tokens, pos: 0 };
        let marker = parser.parse_or().map_err(err)?;
        if parser.pos < parser.tokens.len() {
            return Err(err("unexpected trailing tokens".to_string()));
        }
        Ok(marker)
    }

    /// Whether this marker compares against the `extra` variable anywhere
    pub fn mentions_extra(&self) -> bool {
        match self {
            Self::Compare { lhs, rhs, .. } => [lhs, rhs]
                .iter()
                .any(|v| matches!(v, MarkerValue::Variable(name) if name == "extra")),
            Self::All(items) | Self::Any(items) => items.iter().any(Self::mentions_extra),
        }
    }

    /// Evaluate against `env` with the given extras requested
    ///
    /// With no extras, `extra` compares as the empty string.
    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &[String]) -> bool {
        match self {
            Self::All(items) => items.iter().all(|m| m.evaluate(env, extras)),
            Self::Any(items) => items.iter().any(|m| m.evaluate(env, extras)),
            Self::Compare { lhs, op, rhs } => {
                let is_extra = |v: &MarkerValue| {
                    matches!(v, MarkerValue::Variable(name) if name == "extra")
                };
                if is_extra(lhs) || is_extra(rhs) {
                    let candidates: Vec<String> = if extras.is_empty() {
                        vec![String::new()]
                    } else {
                        extras.iter().map(|e| canonicalize_name(e)).collect()
                    };
                    return candidates.iter().any(|extra| {
                        let resolve = |v: &MarkerValue| match v {
                            MarkerValue::Variable(_) => extra.clone(),
                            MarkerValue::Literal(s) => canonicalize_name(s),
                        };
                        compare_strings(&resolve(lhs), *op, &resolve(rhs))
                    });
                }

                let resolve = |v: &MarkerValue| match v {
                    MarkerValue::Variable(name) => env.get(name).unwrap_or("").to_string(),
                    MarkerValue::Literal(s) => s.clone(),
                };
                compare(&resolve(lhs), *op, &resolve(rhs))
            }
        }
    }
}

fn compare(lhs: &str, op: MarkerOp, rhs: &str) -> bool {
    if matches!(op, MarkerOp::In | MarkerOp::NotIn | MarkerOp::Arbitrary) {
        return compare_strings(lhs, op, rhs);
    }
    match compare_versions(lhs, op, rhs) {
        Some(result) => result,
        None => compare_strings(lhs, op, rhs),
    }
}

fn compare_strings(lhs: &str, op: MarkerOp, rhs: &str) -> bool {
    match op {
        MarkerOp::Equal | MarkerOp::Arbitrary => lhs == rhs,
        MarkerOp::NotEqual => lhs != rhs,
        MarkerOp::In => rhs.contains(lhs),
        MarkerOp::NotIn => !rhs.contains(lhs),
        MarkerOp::Less => lhs < rhs,
        MarkerOp::LessEqual => lhs <= rhs,
        MarkerOp::Greater => lhs > rhs,
        MarkerOp::GreaterEqual => lhs >= rhs,
        MarkerOp::Compatible => false,
    }
}

/// Version comparison; `None` when either side is not a version
fn compare_versions(lhs: &str, op: MarkerOp, rhs: &str) -> Option<bool> {
    let actual = Version::parse(lhs).ok()?;

    if let Some(prefix) = rhs.strip_suffix(".*") {
        let prefix = Version::parse(prefix).ok()?;
        let matches = actual.epoch == prefix.epoch
            && actual.release.len() >= prefix.release.len()
            && actual.release[..prefix.release.len()] == prefix.release[..];
        return match op {
            MarkerOp::Equal => Some(matches),
            MarkerOp::NotEqual => Some(!matches),
            _ => None,
        };
    }

    let wanted = Version::parse(rhs).ok()?;
    let ordering = actual.public().cmp(&wanted);
    Some(match op {
        MarkerOp::Equal => ordering == Ordering::Equal,
        MarkerOp::NotEqual => ordering != Ordering::Equal,
        MarkerOp::Less => ordering == Ordering::Less,
        MarkerOp::LessEqual => ordering != Ordering::Greater,
        MarkerOp::Greater => ordering == Ordering::Greater,
        MarkerOp::GreaterEqual => ordering != Ordering::Less,
        MarkerOp::Compatible => {
            if wanted.release.len() < 2 {
                return None;
            }
            let prefix = &wanted.release[..wanted.release.len() - 1];
            ordering != Ordering::Less
                && actual.epoch == wanted.epoch
                && actual.release.len() >= prefix.len()
                && actual.release[..prefix.len()] == *prefix
        }
        MarkerOp::Arbitrary | MarkerOp::In | MarkerOp::NotIn => return None,
    })
}
