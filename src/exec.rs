//! Narrow command-execution seam.
//!
//! Every external effect — control-plane queries, session lifecycle
//! commands, mounts, even the `touch` nudge — goes through
//! [`CommandRunner`], so the rest of the crate operates only on typed
//! results and tests can script the outside world.

use tokio::process::Command;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Captured outcome of one external command.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

/// Executes one external command to completion.
///
/// Implemented by [`SystemRunner`] for real process execution and by
/// scripted fakes in tests.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run `argv` (binary plus arguments) and capture its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Command`] if the process cannot be spawned.
    /// A non-zero exit is not an error at this layer; it is reported
    /// through [`RunOutput::success`].
    async fn run(&self, argv: &[String]) -> Result<RunOutput>;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, argv: &[String]) -> Result<RunOutput> {
        let (bin, args) = argv
            .split_first()
            .ok_or_else(|| AppError::Command("empty command line".into()))?;

        debug!(command = %argv.join(" "), "executing");
        let output = Command::new(bin)
            .args(args)
            .output()
            .await
            .map_err(|err| AppError::Command(format!("unable to execute {bin}: {err}")))?;

        Ok(RunOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `argv` and return its stdout, failing on non-zero exit.
///
/// On failure the error message combines `failure_msg` with whatever the
/// command wrote (stderr preferred, stdout as fallback). No retry happens
/// here; retries, if any, belong to the calling state machine.
///
/// # Errors
///
/// Returns [`AppError::Command`] on spawn failure or non-zero exit.
pub async fn execute<R: CommandRunner>(
    runner: &R,
    argv: &[String],
    failure_msg: &str,
) -> Result<String> {
    let output = runner.run(argv).await?;
    if output.success {
        return Ok(output.stdout);
    }

    let detail = if output.stderr.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    };
    Err(AppError::Command(format!(
        "{failure_msg}\n{}",
        detail.trim_end()
    )))
}

/// Run `argv`, tolerating failure.
///
/// Used for cleanup-phase commands where a failure must not abort the
/// run. Failures (including spawn failures) are logged at warn level and
/// collapsed to `None`.
pub async fn execute_tolerant<R: CommandRunner>(
    runner: &R,
    argv: &[String],
    failure_msg: &str,
) -> Option<String> {
    match runner.run(argv).await {
        Ok(output) if output.success => Some(output.stdout),
        Ok(output) => {
            warn!(
                command = %argv.join(" "),
                code = ?output.code,
                "{failure_msg}"
            );
            None
        }
        Err(err) => {
            warn!(command = %argv.join(" "), %err, "{failure_msg}");
            None
        }
    }
}
