//! Per-volume brick topology, cached for the process lifetime.

use std::collections::HashMap;

use crate::exec::{self, CommandRunner};
use crate::xml;
use crate::{Result, SchedulerConfig};

/// One node-local storage unit of a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brick {
    /// Brick identity in `node:path` form.
    pub name: String,
    /// Identity of the node hosting the brick.
    pub host_uuid: String,
}

/// Memoized brick lookup keyed by volume name.
///
/// The first call for a volume issues a topology query; later calls
/// return the cached list. Entries are never invalidated within a run:
/// brick topology is assumed stable for the duration of one scheduled
/// window, so a volume expanded mid-run is not observed.
#[derive(Debug, Default)]
pub struct TopologyCache {
    entries: HashMap<String, Vec<Brick>>,
}

impl TopologyCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered brick list for `volume`, querying the control plane on the
    /// first call only. The returned order is the control plane's order
    /// and is the canonical ordering for per-session output.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Command`] if the topology query fails
    /// and [`crate::AppError::MalformedOutput`] if its document cannot
    /// be parsed.
    pub async fn bricks<R: CommandRunner>(
        &mut self,
        runner: &R,
        config: &SchedulerConfig,
        volume: &str,
    ) -> Result<Vec<Brick>> {
        if let Some(cached) = self.entries.get(volume) {
            return Ok(cached.clone());
        }

        let bricks = fetch_bricks(runner, config, volume).await?;
        self.entries.insert(volume.to_owned(), bricks.clone());
        Ok(bricks)
    }
}

async fn fetch_bricks<R: CommandRunner>(
    runner: &R,
    config: &SchedulerConfig,
    volume: &str,
) -> Result<Vec<Brick>> {
    let argv: Vec<String> = vec![
        config.ctl_bin.clone(),
        "volume".into(),
        "info".into(),
        volume.into(),
        "--xml".into(),
    ];
    let raw = exec::execute(
        runner,
        &argv,
        &format!("unable to get volume info for {volume}"),
    )
    .await?;

    let doc = xml::parse_document(&raw, &argv)?;
    let vol_info = xml::required_child(doc.root_element(), "volInfo", &argv)?;
    let volumes = xml::required_child(vol_info, "volumes", &argv)?;
    let volume_el = xml::required_child(volumes, "volume", &argv)?;
    let bricks_el = xml::required_child(volume_el, "bricks", &argv)?;

    let mut bricks = Vec::new();
    for brick in xml::children(bricks_el, "brick") {
        bricks.push(Brick {
            name: xml::required_text(brick, "name", &argv)?,
            host_uuid: xml::required_text(brick, "hostUuid", &argv)?,
        });
    }
    Ok(bricks)
}
