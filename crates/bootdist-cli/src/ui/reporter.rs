//! Line-oriented terminal reporter.
//!
//! Packaging runs on a blocking worker thread, so every line is written
//! through a locked stdout handle and a line is never interleaved with
//! another.

use bootdist_core::Reporter;
use crossterm::style::Stylize;
use std::io::Write;
use std::path::Path;

use super::theme::{Theme, format_size};

#[derive(Debug, Clone, Default)]
pub struct TerminalReporter {
    theme: Theme,
    quiet: bool,
}

impl TerminalReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
        }
    }

    fn line(text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
    }
}

impl Reporter for TerminalReporter {
    fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        Self::line(&format!(
            "{} {}",
            self.theme.section.styled(),
            title.bold()
        ));
    }

    fn produced(&self, path: &Path, detail: &str, size: Option<u64>) {
        if self.quiet {
            return;
        }
        let size = size.map(format_size).unwrap_or_default();
        Self::line(&format!(
            "  {} {} {} {}",
            self.theme.produced.styled(),
            path.display(),
            detail.with(self.theme.muted),
            size.with(self.theme.muted)
        ));
    }

    fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        Self::line(&format!("{} {msg}", self.theme.info.styled()));
    }

    fn success(&self, msg: &str) {
        Self::line(&format!(
            "{} {}",
            self.theme.success.styled(),
            msg.with(self.theme.success.color)
        ));
    }

    fn warning(&self, msg: &str) {
        let _ = writeln!(
            std::io::stderr().lock(),
            "{} {msg}",
            self.theme.warning.styled()
        );
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        self.success(&format!("{count} {action} in {elapsed_secs:.1}s"));
    }
}
