#![forbid(unsafe_code)]

//! `repl-window` — bounded-window replication scheduler binary.
//!
//! Meant to be driven by cron so replication runs in bounded windows,
//! e.g. daily at 20:30:
//!
//! ```text
//! 30 20 * * * root repl-window --no-color gv1 fvm1 gv2 \
//!     >> /var/log/repl-window/schedule.log 2>&1
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use repl_window::config::{FileConfig, SchedulerConfig};
use repl_window::exec::SystemRunner;
use repl_window::mount::{self, MountRegistry};
use repl_window::report::Reporter;
use repl_window::sched::{self, SchedulerContext};
use repl_window::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "repl-window",
    about = "Run one bounded replication window: checkpoint, replicate, stop",
    version,
    long_about = None
)]
struct Cli {
    /// Primary volume name.
    primary_volume: String,

    /// Replica host specification: HOST or USER@HOST.
    replica: String,

    /// Replica volume name.
    replica_volume: String,

    /// Wait time in seconds before each status check.
    #[arg(long, default_value_t = 10)]
    interval: u64,

    /// Timeout in minutes; the session is force-stopped if the
    /// checkpoint is not complete within this budget. 0 means unbounded.
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Don't use color in CLI output.
    #[arg(long)]
    no_color: bool,

    /// Path to an optional TOML file overriding tool paths.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let reporter = Reporter::new(!args.no_color);

    if let Err(err) = init_tracing(args.log_format) {
        reporter.notok(&err.to_string());
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            reporter.notok(&format!("failed to build tokio runtime: {err}"));
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(args, reporter))
}

async fn run(args: Cli, reporter: Reporter) -> ExitCode {
    let file_config = match load_file_config(args.config.as_deref()) {
        Ok(file_config) => file_config,
        Err(err) => {
            reporter.notok(&err.to_string());
            return ExitCode::FAILURE;
        }
    };

    let config = SchedulerConfig::new(
        args.primary_volume,
        args.replica,
        args.replica_volume,
        args.interval,
        args.timeout,
        file_config,
    );

    let registry = Arc::new(MountRegistry::new());
    let runner = SystemRunner;
    let mut ctx = SchedulerContext::new(config, runner, Arc::clone(&registry), reporter);

    let outcome = tokio::select! {
        outcome = sched::run(&mut ctx) => outcome,
        () = shutdown_signal() => Err(AppError::Interrupted),
    };

    // Drain any mounts left behind, on every exit path. Interruption
    // deliberately cleans up local resources only; the replication
    // session itself is not stopped here.
    mount::cleanup_all(&runner, &registry).await;

    match outcome {
        Ok(()) => {
            info!("checkpoint complete, replication window closed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            reporter.notok(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn load_file_config(path: Option<&std::path::Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|err| AppError::Config(format!("cannot read config: {err}")))?;
    FileConfig::from_toml_str(&raw)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
