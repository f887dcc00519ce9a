//! Live replication status: query, typed parsing, and reconciliation
//! against volume topology.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use crate::exec::{self, CommandRunner};
use crate::topology::{Brick, TopologyCache};
use crate::xml;
use crate::{AppError, Result, SchedulerConfig};

/// Field value used when a synthesized row has no live data.
pub const NOT_APPLICABLE: &str = "N/A";

/// Enumerated per-worker replication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Worker is crawling and propagating changes.
    Active,
    /// Standby worker on a replicated brick.
    Passive,
    /// Worker crashed or cannot reach the replica.
    Faulty,
    /// Worker is starting up.
    Initializing,
    /// Session is stopped on this brick.
    Stopped,
    /// Session was created but never started on this brick.
    Created,
    /// Session is paused on this brick.
    Paused,
    /// Brick reported no status at all; synthesized locally.
    Offline,
}

impl WorkerState {
    /// Parse a status label from the control plane.
    ///
    /// Matching is case-insensitive and ignores the trailing ellipsis the
    /// control plane appends to in-progress states.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MalformedOutput`] for any unknown label; an
    /// unrecognized state is never silently defaulted.
    pub fn parse(label: &str) -> Result<Self> {
        let normalized = label
            .trim()
            .trim_end_matches("...")
            .trim_end_matches('\u{2026}')
            .to_ascii_lowercase();
        match normalized.as_str() {
            "active" => Ok(Self::Active),
            "passive" => Ok(Self::Passive),
            "faulty" => Ok(Self::Faulty),
            "initializing" => Ok(Self::Initializing),
            "stopped" => Ok(Self::Stopped),
            "created" => Ok(Self::Created),
            "paused" => Ok(Self::Paused),
            "offline" => Ok(Self::Offline),
            _ => Err(AppError::MalformedOutput(format!(
                "unknown worker status label `{label}`"
            ))),
        }
    }
}

impl Display for WorkerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Active => "Active",
            Self::Passive => "Passive",
            Self::Faulty => "Faulty",
            Self::Initializing => "Initializing",
            Self::Stopped => "Stopped",
            Self::Created => "Created",
            Self::Paused => "Paused",
            Self::Offline => "Offline",
        };
        write!(f, "{label}")
    }
}

/// Per-brick replication worker status.
///
/// Produced either by parsing a live status document or synthesized via
/// [`offline_status`] when a brick is absent from live status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStatus {
    /// Primary volume the worker replicates from.
    pub primary_volume: String,
    /// Replica volume name, derived from the replica URL.
    pub replica_volume: String,
    /// Node hosting the primary brick.
    pub primary_node: String,
    /// Brick path on the primary node.
    pub primary_brick: String,
    /// Identity of the primary node.
    pub primary_node_uuid: String,
    /// Account used on the replica side.
    pub replica_user: String,
    /// Full replica specification, possibly `ssh://`-prefixed.
    pub replica: String,
    /// Replica-side node currently serving this worker.
    pub replica_node: String,
    /// Enumerated worker state.
    pub state: WorkerState,
    /// Crawl phase reported by the worker.
    pub crawl_status: String,
    /// Pending entry-change count.
    pub entry: String,
    /// Pending data-change count.
    pub data: String,
    /// Pending metadata-change count.
    pub meta: String,
    /// Failure count reported by the worker.
    pub failures: String,
    /// Whether the worker has propagated past the current checkpoint.
    pub checkpoint_completed: bool,
    /// Last-synced timestamp as reported.
    pub last_synced: String,
    /// When the current checkpoint was set.
    pub checkpoint_time: String,
    /// When the worker completed the checkpoint, if it has.
    pub checkpoint_completion_time: String,
}

impl WorkerStatus {
    /// Brick identity in `node:path` form.
    #[must_use]
    pub fn brick_id(&self) -> String {
        format!("{}:{}", self.primary_node, self.primary_brick)
    }
}

/// Live status for every reported session.
///
/// `session_keys` is ordered for deterministic iteration; each key maps
/// to the per-brick rows the control plane reported for that session.
#[derive(Debug, Default)]
pub struct LiveStatus {
    /// Session keys in `<primary-volume>:<session-id>:<replica-url>` form.
    pub session_keys: BTreeSet<String>,
    /// Per-session map from brick identity to its worker row.
    pub sessions: HashMap<String, HashMap<String, WorkerStatus>>,
}

/// Query live replication status, optionally scoped to a volume and
/// replica, and parse it into typed rows.
///
/// An empty, well-formed document yields an empty [`LiveStatus`]; that is
/// the recoverable "no status available" case, not an error. The same
/// holds for the error-report document a busy cluster emits with exit
/// status zero, which carries no `<geoRep>` element at all.
///
/// # Errors
///
/// Returns [`AppError::Command`] if the query fails and
/// [`AppError::MalformedOutput`] if the document cannot be parsed.
pub async fn collect<R: CommandRunner>(
    runner: &R,
    config: &SchedulerConfig,
    primary: Option<&str>,
    replica: Option<&str>,
) -> Result<LiveStatus> {
    let mut argv: Vec<String> = vec![
        config.ctl_bin.clone(),
        "volume".into(),
        "geo-replication".into(),
    ];
    if let Some(volume) = primary {
        argv.push(volume.into());
        if let Some(replica) = replica {
            argv.push(replica.into());
        }
    }
    argv.push("status".into());
    argv.push("--xml".into());

    let raw = exec::execute(runner, &argv, "unable to get replication status").await?;
    parse_status(&raw, &argv)
}

fn parse_status(raw: &str, argv: &[String]) -> Result<LiveStatus> {
    let doc = xml::parse_document(raw, argv)?;
    let mut live = LiveStatus::default();

    // While another transaction holds the cluster lock, the control
    // plane exits zero with an <opErrstr> document carrying no <geoRep>
    // at all. That is status-unavailable, not malformed output.
    let Some(geo_rep) = xml::children(doc.root_element(), "geoRep").next() else {
        return Ok(live);
    };
    for volume_el in xml::children(geo_rep, "volume") {
        let primary_volume = xml::required_text(volume_el, "name", argv)?;
        let sessions_el = xml::required_child(volume_el, "sessions", argv)?;

        for session_el in xml::children(sessions_el, "session") {
            let replica_part = xml::required_text(session_el, "session_replica", argv)?;
            let key = format!("{primary_volume}:{replica_part}");
            live.session_keys.insert(key.clone());
            let rows = live.sessions.entry(key).or_default();

            for pair in xml::children(session_el, "pair") {
                let row = parse_pair(pair, &primary_volume, argv)?;
                rows.insert(row.brick_id(), row);
            }
        }
    }
    Ok(live)
}

fn parse_pair(
    pair: roxmltree::Node<'_, '_>,
    primary_volume: &str,
    argv: &[String],
) -> Result<WorkerStatus> {
    let replica = xml::required_text(pair, "replica", argv)?;
    let state = WorkerState::parse(&xml::required_text(pair, "status", argv)?)?;
    Ok(WorkerStatus {
        primary_volume: primary_volume.to_owned(),
        replica_volume: replica_volume_of(&replica),
        primary_node: xml::required_text(pair, "primary_node", argv)?,
        primary_brick: xml::required_text(pair, "primary_brick", argv)?,
        primary_node_uuid: xml::required_text(pair, "primary_node_uuid", argv)?,
        replica_user: xml::required_text(pair, "replica_user", argv)?,
        replica,
        replica_node: xml::required_text(pair, "replica_node", argv)?,
        state,
        crawl_status: xml::required_text(pair, "crawl_status", argv)?,
        entry: xml::required_text(pair, "entry", argv)?,
        data: xml::required_text(pair, "data", argv)?,
        meta: xml::required_text(pair, "meta", argv)?,
        failures: xml::required_text(pair, "failures", argv)?,
        checkpoint_completed: xml::required_text(pair, "checkpoint_completed", argv)? == "Yes",
        last_synced: xml::required_text(pair, "last_synced", argv)?,
        checkpoint_time: xml::required_text(pair, "checkpoint_time", argv)?,
        checkpoint_completion_time: xml::required_text(pair, "checkpoint_completion_time", argv)?,
    })
}

/// Replica volume name: the portion after the last `::` separator.
fn replica_volume_of(replica: &str) -> String {
    replica.rsplit("::").next().unwrap_or(replica).to_owned()
}

/// Replica-side account derived from a `user@host` form; bare hosts
/// default to `root`.
fn replica_user_of(replica: &str) -> String {
    match replica.split_once('@') {
        Some((user, _)) => user.to_owned(),
        None => "root".to_owned(),
    }
}

/// Synthesize the row for a brick absent from live status.
///
/// # Errors
///
/// Returns [`AppError::MalformedOutput`] if the brick name is not in
/// `node:path` form.
pub fn offline_status(primary_volume: &str, brick: &Brick, replica: &str) -> Result<WorkerStatus> {
    let (node, path) = brick.name.split_once(':').ok_or_else(|| {
        AppError::MalformedOutput(format!("brick name `{}` is not node:path", brick.name))
    })?;

    Ok(WorkerStatus {
        primary_volume: primary_volume.to_owned(),
        replica_volume: replica_volume_of(replica),
        primary_node: node.to_owned(),
        primary_brick: path.to_owned(),
        primary_node_uuid: brick.host_uuid.clone(),
        replica_user: replica_user_of(replica),
        replica: replica.to_owned(),
        replica_node: NOT_APPLICABLE.to_owned(),
        state: WorkerState::Offline,
        crawl_status: NOT_APPLICABLE.to_owned(),
        entry: NOT_APPLICABLE.to_owned(),
        data: NOT_APPLICABLE.to_owned(),
        meta: NOT_APPLICABLE.to_owned(),
        failures: NOT_APPLICABLE.to_owned(),
        checkpoint_completed: false,
        last_synced: NOT_APPLICABLE.to_owned(),
        checkpoint_time: NOT_APPLICABLE.to_owned(),
        checkpoint_completion_time: NOT_APPLICABLE.to_owned(),
    })
}

/// Reconcile live status for the given pair against volume topology.
///
/// For every session the scoped status query reports, the canonical brick
/// ordering comes from [`TopologyCache`]; bricks with a live row keep it,
/// bricks without one get a synthesized Offline row. The result therefore
/// always has exactly one row per topology brick, in topology order. An
/// empty result means no session status was available.
///
/// # Errors
///
/// Propagates query, parse, and topology errors; a session key that does
/// not carry a `<volume>:<id>:<url>` shape is malformed output.
pub async fn reconcile<R: CommandRunner>(
    runner: &R,
    config: &SchedulerConfig,
    topology: &mut TopologyCache,
    primary: &str,
    replica_url: &str,
) -> Result<Vec<Vec<WorkerStatus>>> {
    let live = collect(runner, config, Some(primary), Some(replica_url)).await?;

    let mut out = Vec::new();
    for key in &live.session_keys {
        let mut parts = key.splitn(3, ':');
        let (volume, replica_part) = match (parts.next(), parts.next(), parts.next()) {
            (Some(volume), Some(_id), Some(rest)) => (volume.to_owned(), rest),
            _ => {
                return Err(AppError::MalformedOutput(format!(
                    "unexpected session key `{key}`"
                )))
            }
        };
        let replica_spec = replica_part.trim_start_matches("ssh://").to_owned();

        let bricks = topology.bricks(runner, config, &volume).await?;
        let rows = live.sessions.get(key);

        let mut session_rows = Vec::with_capacity(bricks.len());
        for brick in &bricks {
            let row = rows.and_then(|map| map.get(&brick.name));
            match row {
                Some(row) => session_rows.push(row.clone()),
                None => session_rows.push(offline_status(&volume, brick, &replica_spec)?),
            }
        }
        out.push(session_rows);
    }
    Ok(out)
}
