//! Command seam behavior: success passthrough, failure classification,
//! and tolerant cleanup-phase execution.

use repl_window::exec::{self, CommandRunner, SystemRunner};
use repl_window::AppError;

use super::common::FakeRunner;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn execute_returns_stdout_on_success() {
    let runner = FakeRunner::new();
    runner.on_ok("volume info", "<cliOutput/>");

    let out = exec::execute(&runner, &argv(&["gluster", "volume", "info"]), "boom")
        .await
        .expect("success");
    assert_eq!(out, "<cliOutput/>");
}

#[tokio::test]
async fn execute_failure_carries_message_and_stderr() {
    let runner = FakeRunner::new();
    runner.on_fail("start", "Another transaction is in progress");

    let err = exec::execute(
        &runner,
        &argv(&["gluster", "start"]),
        "unable to start replication session",
    )
    .await
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("unable to start replication session"));
    assert!(msg.contains("Another transaction is in progress"));
    assert!(matches!(err, AppError::Command(_)));
}

#[tokio::test]
async fn execute_failure_falls_back_to_stdout() {
    let runner = FakeRunner::new();
    runner.on(
        "start",
        repl_window::exec::RunOutput {
            success: false,
            code: Some(1),
            stdout: "geo-replication command failed".into(),
            stderr: String::new(),
        },
    );

    let err = exec::execute(&runner, &argv(&["gluster", "start"]), "unable to start")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("geo-replication command failed"));
}

#[tokio::test]
async fn execute_tolerant_collapses_failure_to_none() {
    let runner = FakeRunner::new();
    runner.on_fail("rmdir", "Directory not empty");

    let out = exec::execute_tolerant(
        &runner,
        &argv(&["rmdir", "/tmp/x"]),
        "unable to remove temp directory",
    )
    .await;
    assert!(out.is_none());
}

#[tokio::test]
async fn execute_tolerant_passes_stdout_through() {
    let runner = FakeRunner::new();
    runner.on_ok("umount", "done");

    let out = exec::execute_tolerant(&runner, &argv(&["umount", "-l", "/tmp/x"]), "boom").await;
    assert_eq!(out.as_deref(), Some("done"));
}

#[tokio::test]
async fn empty_command_line_is_rejected() {
    let err = SystemRunner.run(&[]).await.unwrap_err();
    assert!(matches!(err, AppError::Command(_)));
}
