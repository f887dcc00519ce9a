//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// A control-plane or mount command exited non-zero.
    Command(String),
    /// A topology or status document failed to parse as expected.
    MalformedOutput(String),
    /// A scoped volume mount could not be established or verified.
    Mount(String),
    /// The checkpoint did not complete within the configured budget.
    Timeout(String),
    /// The run was interrupted by an external signal.
    Interrupted,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Command(msg) => write!(f, "command failed: {msg}"),
            Self::MalformedOutput(msg) => write!(f, "malformed output: {msg}"),
            Self::Mount(msg) => write!(f, "mount: {msg}"),
            Self::Timeout(msg) => write!(f, "timed out: {msg}"),
            Self::Interrupted => write!(f, "interrupted, exiting"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
