//! `uv pip compile` adapter
//!
//! Locates the `uv` executable and runs it to produce a `pylock.toml`.

use std::path::{Path, PathBuf};

use crate::config::env::UV_BIN;
use crate::error::ResolveError;

/// Arguments for one `uv pip compile` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// `requirements.in` listing what to solve for
    pub requirements: PathBuf,
    /// `constraints.txt` pinning the baseline
    pub constraints: PathBuf,
    /// `excludes.txt`, when anything is excluded
    pub excludes: Option<PathBuf>,
    /// `pylock.toml` to write
    pub output_file: PathBuf,
    pub python_platform: String,
    /// `major.minor` only; patch releases may be unknown to the solver
    pub python_version: String,
    pub extra_args: Vec<String>,
}

impl CompileRequest {
    /// Command line arguments after the program name
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "pip".to_string(),
            "compile".to_string(),
            "--format=pylock.toml".to_string(),
            "--no-build".to_string(),
            format!("--python-platform={}", self.python_platform),
            format!("--python-version={}", self.python_version),
            format!("--output-file={}", self.output_file.display()),
            format!("--constraints={}", self.constraints.display()),
        ];
        if let Some(excludes) = &self.excludes {
            args.push(format!("--excludes={}", excludes.display()));
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(self.requirements.display().to_string());
        args
    }
}

/// A located `uv` executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvSolver {
    program: PathBuf,
}

impl UvSolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `uv`: an explicit path, then `$UV_BIN`, then `uv` on `PATH`
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ResolveError> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        if let Some(path) = std::env::var_os(UV_BIN).filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            if path.is_file() {
                return Ok(Self::new(path));
            }
            tracing::debug!("${UV_BIN} points at missing file {}", path.display());
        }

        which::which("uv")
            .map(Self::new)
            .map_err(|_| ResolveError::UvNotFound {
                env_var: UV_BIN.to_string(),
            })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the solver and return the path of the written `pylock.toml`
    pub async fn compile(&self, request: &CompileRequest) -> Result<PathBuf, ResolveError> {
        let args = request.args();
        let command = std::iter::once(self.program.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        tracing::debug!("Running:\n---\n\t{}\n---", command);

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| ResolveError::Spawn {
                program: self.program.clone(),
                error: e.to_string(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim_end().to_string();
        if combined.is_empty() {
            tracing::warn!("Output:\n---\n\t<no output>\n---");
        } else {
            tracing::warn!("Output:\n---\n{}\n---", indent(&combined));
        }

        if !output.status.success() {
            return Err(ResolveError::SolverFailed {
                command,
                output_file: request.output_file.clone(),
                output: combined,
            });
        }

        if !request.output_file.is_file() {
            return Err(ResolveError::InvalidPylock {
                path: request.output_file.clone(),
                error: "the solver did not write it".to_string(),
            });
        }

        Ok(request.output_file.clone())
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("\t{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
