#![forbid(unsafe_code)]

//! Bounded-window scheduler for asynchronous volume replication.
//!
//! Drives one scheduled replication run: force-stop any running session,
//! set a checkpoint, start the session, then poll per-worker status until
//! the checkpoint has propagated to every worker (or a timeout elapses)
//! and stop the session again.

pub mod config;
pub mod errors;
pub mod exec;
pub mod mount;
pub mod report;
pub mod sched;
pub mod status;
pub mod summary;
pub mod topology;
mod xml;

pub use config::SchedulerConfig;
pub use errors::{AppError, Result};
