//! Reduction of per-worker rows into a session verdict.

use crate::status::{WorkerState, WorkerStatus};

/// Aggregate view of one session's worker rows.
///
/// Derived, never stored; a fresh summary is produced from each poll's
/// rows, so the faulty/offline lists are per-iteration, not cumulative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Workers crawling and propagating changes.
    pub active: u32,
    /// Standby workers.
    pub passive: u32,
    /// Crashed or unreachable workers.
    pub faulty: u32,
    /// Workers still starting up.
    pub initializing: u32,
    /// Stopped workers.
    pub stopped: u32,
    /// Created-but-never-started workers.
    pub created: u32,
    /// Paused workers.
    pub paused: u32,
    /// Bricks with no live status at all.
    pub offline: u32,
    /// Total worker rows seen.
    pub workers: u32,
    /// Workers whose checkpoint-completed flag is set.
    pub completed_checkpoints: u32,
    /// Every active worker completed the checkpoint and none is faulty
    /// or offline.
    pub checkpoints_complete: bool,
    /// No worker is faulty or offline. Computed independently of
    /// [`Self::checkpoints_complete`]; neither implies the other.
    pub healthy: bool,
    /// Brick identities of faulty workers, this poll only.
    pub faulty_bricks: Vec<String>,
    /// Brick identities of offline workers, this poll only.
    pub offline_bricks: Vec<String>,
    /// Display name `<primary>=><replica>`; `None` when there were no
    /// rows to derive it from, which callers must treat as "no status
    /// available" rather than "unhealthy".
    pub session_name: Option<String>,
}

/// Summarize one session's worker rows in a single pass.
///
/// Pure function of its input: the same rows always produce the same
/// summary.
#[must_use]
pub fn summarize(rows: &[WorkerStatus]) -> SessionSummary {
    let mut summary = SessionSummary::default();

    for row in rows {
        match row.state {
            WorkerState::Active => summary.active += 1,
            WorkerState::Passive => summary.passive += 1,
            WorkerState::Faulty => summary.faulty += 1,
            WorkerState::Initializing => summary.initializing += 1,
            WorkerState::Stopped => summary.stopped += 1,
            WorkerState::Created => summary.created += 1,
            WorkerState::Paused => summary.paused += 1,
            WorkerState::Offline => summary.offline += 1,
        }
        summary.workers += 1;
        if row.checkpoint_completed {
            summary.completed_checkpoints += 1;
        }

        // Uniform across a session by construction; any row will do.
        summary.session_name = Some(format!(
            "{}=>{}",
            row.primary_volume,
            row.replica.trim_start_matches("ssh://")
        ));

        match row.state {
            WorkerState::Faulty => summary.faulty_bricks.push(row.brick_id()),
            WorkerState::Offline => summary.offline_bricks.push(row.brick_id()),
            _ => {}
        }
    }

    summary.healthy = summary.faulty == 0 && summary.offline == 0;
    summary.checkpoints_complete =
        summary.active == summary.completed_checkpoints && summary.healthy;

    summary
}
