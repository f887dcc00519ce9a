//! Scoped mount acquisition, release, and the interrupt-drain registry.

use repl_window::mount::{self, MountRegistry};
use repl_window::AppError;

use super::common::{test_config, FakeRunner};

#[tokio::test]
async fn acquire_mounts_verifies_and_registers() {
    let runner = FakeRunner::new();
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let mounted = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .expect("mount succeeds");

    assert_eq!(registry.len(), 1);
    let calls = runner.calls();
    let mount_call = &calls[0];
    assert_eq!(mount_call[0], "glusterfs");
    assert!(mount_call.contains(&"--volfile-server".to_owned()));
    assert!(mount_call.contains(&"localhost".to_owned()));
    assert!(mount_call.contains(&"gv1".to_owned()));
    assert_eq!(calls[1][0], "mountpoint");

    mounted
        .release(&runner, &registry)
        .await
        .expect("release succeeds");
    assert!(registry.is_empty());
}

#[tokio::test]
async fn release_unmounts_then_removes_exactly_once() {
    let runner = FakeRunner::new();
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let mounted = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .expect("mount succeeds");
    mounted
        .release(&runner, &registry)
        .await
        .expect("release succeeds");

    assert_eq!(runner.count_matching("umount -l"), 1);
    assert_eq!(runner.count_matching("rmdir"), 1);
}

#[tokio::test]
async fn failed_verification_is_a_mount_error_and_stays_registered() {
    let runner = FakeRunner::new();
    runner.on_fail("mountpoint", "");
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let err = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Mount(_)));

    // The path is still tracked, so exit-path cleanup can unmount it.
    assert_eq!(registry.len(), 1);
    mount::cleanup_all(&runner, &registry).await;
    assert!(registry.is_empty());
    assert_eq!(runner.count_matching("umount -l"), 1);
}

#[tokio::test]
async fn interrupt_drain_wins_over_late_release() {
    let runner = FakeRunner::new();
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let mounted = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .expect("mount succeeds");

    // Interrupt path drains the registry first.
    mount::cleanup_all(&runner, &registry).await;
    assert!(registry.is_empty());
    assert_eq!(runner.count_matching("umount -l"), 1);

    // A release racing the drain becomes a no-op: no second unmount.
    mounted
        .release(&runner, &registry)
        .await
        .expect("late release is a no-op");
    assert_eq!(runner.count_matching("umount -l"), 1);
    assert_eq!(runner.count_matching("rmdir"), 1);
}

#[tokio::test]
async fn drain_takes_everything_atomically() {
    let runner = FakeRunner::new();
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let first = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .expect("first mount");
    let second = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .expect("second mount");
    assert_eq!(registry.len(), 2);

    let drained = registry.drain();
    assert_eq!(drained.len(), 2);
    assert!(registry.is_empty());
    assert!(registry.drain().is_empty());

    drop((first, second));
}

#[tokio::test]
async fn unmount_failure_on_release_is_fatal() {
    let runner = FakeRunner::new();
    runner.on_fail("umount", "target is busy");
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let mounted = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .expect("mount succeeds");
    let err = mounted.release(&runner, &registry).await.unwrap_err();
    assert!(matches!(err, AppError::Command(_)));
    assert!(err.to_string().contains("target is busy"));
}

#[tokio::test]
async fn cleanup_all_tolerates_unmount_failure() {
    let runner = FakeRunner::new();
    runner.on_fail("umount", "target is busy");
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let _mounted = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .expect("mount succeeds");

    // Best-effort: the failure is logged, not propagated.
    mount::cleanup_all(&runner, &registry).await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn mount_command_failure_propagates() {
    let runner = FakeRunner::new();
    runner.on_fail("--volfile-server", "connection to localhost failed");
    let registry = MountRegistry::new();
    let config = test_config(10, 0, 60);

    let err = mount::acquire(&runner, &config, &registry, "localhost", "gv1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Command(_)));
    // Registered before the mount attempt; cleanup later removes it.
    assert_eq!(registry.len(), 1);
}
