//! Scheduler configuration: session address, timing, and tool paths.
//!
//! The session address and timing knobs come from the command line; tool
//! paths and the warm-up delay may additionally be overridden from an
//! optional TOML file so packaged deployments can point at non-default
//! control-plane binaries.

use std::time::Duration;

use serde::Deserialize;

use crate::Result;

fn default_ctl_bin() -> String {
    "gluster".into()
}

fn default_mount_bin() -> String {
    "glusterfs".into()
}

fn default_mount_log_file() -> String {
    "/var/log/repl-window/mount.log".into()
}

fn default_warmup_seconds() -> u64 {
    60
}

/// Optional file-based overrides for tool paths and warm-up timing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    /// Control-plane CLI binary used for all session commands.
    #[serde(default = "default_ctl_bin")]
    pub ctl_bin: String,
    /// Mount client binary used for scoped volume mounts.
    #[serde(default = "default_mount_bin")]
    pub mount_bin: String,
    /// Log file handed to the mount client.
    #[serde(default = "default_mount_log_file")]
    pub mount_log_file: String,
    /// Delay after session start before the first status poll.
    #[serde(default = "default_warmup_seconds")]
    pub warmup_seconds: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            ctl_bin: default_ctl_bin(),
            mount_bin: default_mount_bin(),
            mount_log_file: default_mount_log_file(),
            warmup_seconds: default_warmup_seconds(),
        }
    }
}

impl FileConfig {
    /// Parse overrides from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Config`] if the document is not valid
    /// TOML or contains unknown keys.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Fully resolved configuration for one scheduler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Primary volume whose changes are replicated.
    pub primary_volume: String,
    /// Replica host specification: `host` or `user@host`.
    pub replica: String,
    /// Replica volume name on the remote side.
    pub replica_volume: String,
    /// Wait between status polls.
    pub interval: Duration,
    /// Overall budget from session start; `None` means unbounded.
    pub timeout: Option<Duration>,
    /// Delay after session start before the first status poll.
    pub warmup: Duration,
    /// Control-plane CLI binary.
    pub ctl_bin: String,
    /// Mount client binary.
    pub mount_bin: String,
    /// Log file handed to the mount client.
    pub mount_log_file: String,
}

impl SchedulerConfig {
    /// Combine CLI-provided session parameters with file overrides.
    #[must_use]
    pub fn new(
        primary_volume: String,
        replica: String,
        replica_volume: String,
        interval_seconds: u64,
        timeout_minutes: u64,
        file: FileConfig,
    ) -> Self {
        Self {
            primary_volume,
            replica,
            replica_volume,
            interval: Duration::from_secs(interval_seconds),
            timeout: (timeout_minutes > 0).then(|| Duration::from_secs(timeout_minutes * 60)),
            warmup: Duration::from_secs(file.warmup_seconds),
            ctl_bin: file.ctl_bin,
            mount_bin: file.mount_bin,
            mount_log_file: file.mount_log_file,
        }
    }

    /// Fully qualified replica specification: `user@host::volume`.
    #[must_use]
    pub fn replica_url(&self) -> String {
        format!("{}::{}", self.replica, self.replica_volume)
    }

    /// Build a session lifecycle command addressed to the configured pair.
    ///
    /// `tail` is the verb portion, e.g. `["stop", "force"]` or
    /// `["config", "checkpoint", "now"]`.
    #[must_use]
    pub fn session_command(&self, tail: &[&str]) -> Vec<String> {
        let mut argv = vec![
            self.ctl_bin.clone(),
            "volume".into(),
            "geo-replication".into(),
            self.primary_volume.clone(),
            self.replica_url(),
        ];
        argv.extend(tail.iter().map(ToString::to_string));
        argv
    }
}
