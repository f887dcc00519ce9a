//! Scoped temporary volume mounts with guaranteed cleanup.
//!
//! A mount exists only to synthesize a filesystem event on the volume
//! root. Every mount path is tracked in a [`MountRegistry`] from the
//! moment its directory exists, so whichever path exits first — normal
//! release, a propagated failure, or the interrupt handler — can clean
//! it up without racing the other: ownership of a path is taken from the
//! registry exactly once.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::exec::{self, CommandRunner};
use crate::{AppError, Result, SchedulerConfig};

/// Process-wide registry of currently mounted scoped volumes.
#[derive(Debug, Default)]
pub struct MountRegistry {
    paths: Mutex<Vec<PathBuf>>,
}

impl MountRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, path: PathBuf) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path);
        }
    }

    /// Remove `path` from the registry, returning whether it was still
    /// tracked. A `false` result means another drain already took it.
    fn take(&self, path: &Path) -> bool {
        let Ok(mut paths) = self.paths.lock() else {
            return false;
        };
        match paths.iter().position(|p| p == path) {
            Some(idx) => {
                paths.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Take every tracked path, leaving the registry empty, as one
    /// atomic step.
    #[must_use]
    pub fn drain(&self) -> Vec<PathBuf> {
        self.paths
            .lock()
            .map(|mut paths| std::mem::take(&mut *paths))
            .unwrap_or_default()
    }

    /// Number of currently tracked mount paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.lock().map(|paths| paths.len()).unwrap_or(0)
    }

    /// Whether no mount paths are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A mounted volume scoped to one nudge operation.
///
/// Must be released with [`ScopedMount::release`]; if the owner never
/// gets there (propagated failure, interrupt), the path is still in the
/// registry and [`cleanup_all`] unmounts and removes it.
#[derive(Debug)]
pub struct ScopedMount {
    path: PathBuf,
}

impl ScopedMount {
    /// Local path the volume is mounted at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Mount `volume` from `host` at a fresh temporary directory and verify
/// the mount took effect.
///
/// The directory is registered before the mount command runs, so a
/// failure at any later step still leaves the path visible to
/// [`cleanup_all`].
///
/// # Errors
///
/// Returns [`AppError::Mount`] if the directory cannot be created or the
/// mount does not verify, and [`AppError::Command`] if the mount command
/// itself fails.
pub async fn acquire<R: CommandRunner>(
    runner: &R,
    config: &SchedulerConfig,
    registry: &MountRegistry,
    host: &str,
    volume: &str,
) -> Result<ScopedMount> {
    let dir = tempfile::Builder::new()
        .prefix("repl-window-")
        .tempdir()
        .map_err(|err| AppError::Mount(format!("unable to create mount directory: {err}")))?;
    // Removal is ordered after unmount, so the registry owns cleanup
    // rather than TempDir's drop.
    let path = dir.into_path();
    registry.register(path.clone());

    let path_str = path.to_string_lossy().into_owned();
    let argv: Vec<String> = vec![
        config.mount_bin.clone(),
        "--volfile-server".into(),
        host.into(),
        "--volfile-id".into(),
        volume.into(),
        "-l".into(),
        config.mount_log_file.clone(),
        path_str.clone(),
    ];
    exec::execute(
        runner,
        &argv,
        &format!("unable to mount volume {host}:{volume}"),
    )
    .await?;

    let probe: Vec<String> = vec!["mountpoint".into(), "-q".into(), path_str];
    let verified = runner.run(&probe).await?;
    if !verified.success {
        return Err(AppError::Mount(format!(
            "volume {host}:{volume} did not mount at {}",
            path.display()
        )));
    }

    Ok(ScopedMount { path })
}

impl ScopedMount {
    /// Lazy-unmount the path and remove its directory.
    ///
    /// Unmount failure is fatal; directory removal is best-effort. A
    /// no-op if an interrupt drain already took the path.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Command`] if the unmount fails.
    pub async fn release<R: CommandRunner>(
        self,
        runner: &R,
        registry: &MountRegistry,
    ) -> Result<()> {
        if !registry.take(&self.path) {
            return Ok(());
        }

        let path = self.path.to_string_lossy().into_owned();
        exec::execute(
            runner,
            &umount_argv(&path),
            &format!("unable to unmount volume mounted at {path}"),
        )
        .await?;
        exec::execute_tolerant(
            runner,
            &rmdir_argv(&path),
            &format!("unable to remove temp directory {path}"),
        )
        .await;
        Ok(())
    }
}

/// Best-effort unmount and removal of every still-tracked mount path.
///
/// Runs on scheduler exit and on interrupt. Draining is atomic, so a
/// path cleaned here can no longer be released by its owner.
pub async fn cleanup_all<R: CommandRunner>(runner: &R, registry: &MountRegistry) {
    for path in registry.drain() {
        let path = path.to_string_lossy().into_owned();
        exec::execute_tolerant(
            runner,
            &umount_argv(&path),
            &format!("unable to unmount volume mounted at {path}"),
        )
        .await;
        exec::execute_tolerant(
            runner,
            &rmdir_argv(&path),
            &format!("unable to remove temp directory {path}"),
        )
        .await;
    }
}

fn umount_argv(path: &str) -> Vec<String> {
    vec!["umount".into(), "-l".into(), path.into()]
}

fn rmdir_argv(path: &str) -> Vec<String> {
    vec!["rmdir".into(), path.into()]
}
