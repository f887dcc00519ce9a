//! Tagged status lines on the diagnostic stream.
//!
//! Every user-facing line carries a bracketed `[    OK]`, `[  WARN]`, or
//! `[NOT OK]` tag, colored green/yellow/red unless color is disabled.
//! This surface is the contract consumers of the cron log parse; internal
//! diagnostics go through `tracing` instead.

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Writer for tagged status lines on stderr.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    color: bool,
}

impl Reporter {
    /// Construct a reporter; `color` enables ANSI-colored tags.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Render an `[    OK]` line without emitting it.
    #[must_use]
    pub fn ok_line(&self, msg: &str) -> String {
        self.render("[    OK]", GREEN, msg)
    }

    /// Render a `[  WARN]` line without emitting it.
    #[must_use]
    pub fn warn_line(&self, msg: &str) -> String {
        self.render("[  WARN]", YELLOW, msg)
    }

    /// Render a `[NOT OK]` line without emitting it.
    #[must_use]
    pub fn notok_line(&self, msg: &str) -> String {
        self.render("[NOT OK]", RED, msg)
    }

    /// Emit an `[    OK]` line to stderr.
    pub fn ok(&self, msg: &str) {
        eprintln!("{}", self.ok_line(msg));
    }

    /// Emit a `[  WARN]` line to stderr.
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", self.warn_line(msg));
    }

    /// Emit a `[NOT OK]` line to stderr.
    pub fn notok(&self, msg: &str) {
        eprintln!("{}", self.notok_line(msg));
    }

    fn render(&self, tag: &str, color: &str, msg: &str) -> String {
        if self.color {
            format!("{color}{tag}{RESET} {msg}")
        } else {
            format!("{tag} {msg}")
        }
    }
}
