//! Output formatting and progress indicators
//!
//! Status lines go to stdout and are silenced by `--quiet`; errors always
//! go to stderr.

use indicatif::{ProgressBar, ProgressStyle};

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// How chatty the CLI is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, verbose: u8) -> Self {
        Self { quiet, verbose }
    }

    /// Log level implied by the flags: `--quiet` wins over `-v`
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }

    pub fn success(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{} {}", status::SUCCESS, message.as_ref());
        }
    }

    pub fn failure(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{} {}", status::ERROR, message.as_ref());
        }
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{} {}", status::WARNING, message.as_ref());
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{} {}", status::INFO, message.as_ref());
        }
    }

    /// Spinner, unless output is quiet or logs would interleave with it
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        (!self.quiet && self.verbose == 0).then(|| create_spinner(message))
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}
