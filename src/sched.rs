//! The scheduling state machine.
//!
//! One run sequences: existence check → force stop → set checkpoint →
//! start → warm-up → mount-touch → poll loop → stop. Any command failure
//! that is not explicitly tolerated propagates immediately and halts the
//! whole run; missing status is the only condition polled through.

use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::exec::{self, CommandRunner};
use crate::mount::{self, MountRegistry};
use crate::report::Reporter;
use crate::status;
use crate::summary::{self, SessionSummary};
use crate::topology::TopologyCache;
use crate::{AppError, Result, SchedulerConfig};

/// Everything one scheduler run owns: configuration, the command seam,
/// the topology cache, the mount registry, and the reporter.
///
/// The registry is shared with the interrupt path via `Arc`; everything
/// else is exclusive to the single logical thread of control.
#[derive(Debug)]
pub struct SchedulerContext<R> {
    /// Resolved run configuration.
    pub config: SchedulerConfig,
    /// Command-execution seam.
    pub runner: R,
    /// Per-volume brick cache, valid for this run.
    pub topology: TopologyCache,
    /// Registry of currently mounted scoped volumes.
    pub registry: Arc<MountRegistry>,
    /// Tagged-line output surface.
    pub reporter: Reporter,
}

impl<R: CommandRunner> SchedulerContext<R> {
    /// Build a context for one run.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        runner: R,
        registry: Arc<MountRegistry>,
        reporter: Reporter,
    ) -> Self {
        Self {
            config,
            runner,
            topology: TopologyCache::new(),
            registry,
            reporter,
        }
    }
}

/// Drive one bounded replication window to completion.
///
/// # Errors
///
/// Returns [`AppError::Command`] on any fatal command failure,
/// [`AppError::MalformedOutput`] on an unparseable control-plane
/// document, and [`AppError::Timeout`] if the configured budget elapses
/// before the checkpoint completes.
pub async fn run<R: CommandRunner>(ctx: &mut SchedulerContext<R>) -> Result<()> {
    let config = ctx.config.clone();
    let replica_url = config.replica_url();

    // Verify the session exists before mutating anything.
    exec::execute(
        &ctx.runner,
        &config.session_command(&["status"]),
        &format!(
            "no replication session between {} and {replica_url}",
            config.primary_volume
        ),
    )
    .await?;

    exec::execute(
        &ctx.runner,
        &config.session_command(&["stop", "force"]),
        "unable to stop replication session",
    )
    .await?;
    ctx.reporter.ok("stopped replication session");

    exec::execute(
        &ctx.runner,
        &config.session_command(&["config", "checkpoint", "now"]),
        "unable to set checkpoint",
    )
    .await?;
    ctx.reporter.ok("set checkpoint");

    exec::execute(
        &ctx.runner,
        &config.session_command(&["start"]),
        "unable to start replication session",
    )
    .await?;
    ctx.reporter
        .ok("started replication session, watching status until checkpoint completion");

    let started = Instant::now();

    // Let the replication engine initialize before the first read.
    sleep(config.warmup).await;

    touch_mount_root(ctx).await?;

    let mut turns: u32 = 1;
    loop {
        match poll_once(ctx, &replica_url, turns).await? {
            PollVerdict::Complete => {
                ctx.reporter.ok("stopping replication session now");
                exec::execute(
                    &ctx.runner,
                    &config.session_command(&["stop"]),
                    "unable to stop replication session",
                )
                .await?;
                return Ok(());
            }
            PollVerdict::Incomplete => {
                // A brick that came back online has no local change event
                // of its own; without a fresh touch its stime never
                // advances and the checkpoint never completes.
                touch_mount_root(ctx).await?;
            }
            PollVerdict::NoStatus => {
                ctx.reporter.warn("unable to get replication status");
            }
        }

        turns += 1;
        let elapsed = started.elapsed();
        if let Some(budget) = config.timeout {
            if elapsed > budget {
                exec::execute(
                    &ctx.runner,
                    &config.session_command(&["stop", "force"]),
                    "unable to stop replication session",
                )
                .await?;
                return Err(AppError::Timeout(format!(
                    "checkpoint not complete after {}s, replication session stopped",
                    elapsed.as_secs()
                )));
            }
        }

        sleep(config.interval).await;
    }
}

enum PollVerdict {
    Complete,
    Incomplete,
    NoStatus,
}

async fn poll_once<R: CommandRunner>(
    ctx: &mut SchedulerContext<R>,
    replica_url: &str,
    turns: u32,
) -> Result<PollVerdict> {
    let sessions = status::reconcile(
        &ctx.runner,
        &ctx.config,
        &mut ctx.topology,
        &ctx.config.primary_volume,
        replica_url,
    )
    .await?;

    let summaries: Vec<SessionSummary> = sessions
        .iter()
        .map(|rows| summary::summarize(rows))
        .filter(|summary| summary.session_name.is_some())
        .collect();

    let Some(first) = summaries.first() else {
        return Ok(PollVerdict::NoStatus);
    };
    debug!(?first, "session summary");

    let checkpoint_verdict = if first.checkpoints_complete {
        "COMPLETE"
    } else {
        "NOT COMPLETE"
    };
    let health_verdict = if first.healthy { "OK" } else { "NOT OK" };
    let line = format!(
        "all checkpoints {checkpoint_verdict}, all status {health_verdict} (turn {turns:>3})"
    );

    if first.healthy {
        ctx.reporter.ok(&line);
    } else {
        ctx.reporter.warn(&line);
        ctx.reporter.warn(&format!(
            "workers faulty/offline, faulty: {:?} offline: {:?}",
            first.faulty_bricks, first.offline_bricks
        ));
    }

    if first.checkpoints_complete {
        Ok(PollVerdict::Complete)
    } else {
        Ok(PollVerdict::Incomplete)
    }
}

/// Mount the primary volume and touch its root.
///
/// Guarantees at least one propagatable change exists after the
/// checkpoint was set; a checkpoint with zero subsequent changes may
/// never report complete.
async fn touch_mount_root<R: CommandRunner>(ctx: &mut SchedulerContext<R>) -> Result<()> {
    let mounted = mount::acquire(
        &ctx.runner,
        &ctx.config,
        &ctx.registry,
        "localhost",
        &ctx.config.primary_volume,
    )
    .await?;

    let touch: Vec<String> = vec![
        "touch".into(),
        mounted.path().to_string_lossy().into_owned(),
    ];
    let touched = exec::execute(&ctx.runner, &touch, "unable to touch mount root")
        .await
        .map(|_| ());
    // Release before propagating a touch failure.
    let released = mounted.release(&ctx.runner, &ctx.registry).await;
    touched?;
    released
}
