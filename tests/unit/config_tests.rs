//! File-config parsing and resolved scheduler configuration.

use std::time::Duration;

use repl_window::config::{FileConfig, SchedulerConfig};

use super::common::test_config;

#[test]
fn file_config_defaults() {
    let config = FileConfig::from_toml_str("").expect("empty config parses");
    assert_eq!(config.ctl_bin, "gluster");
    assert_eq!(config.mount_bin, "glusterfs");
    assert_eq!(config.warmup_seconds, 60);
}

#[test]
fn file_config_overrides() {
    let config = FileConfig::from_toml_str(
        r#"
ctl_bin = "/usr/local/sbin/gluster"
mount_bin = "/usr/local/sbin/glusterfs"
mount_log_file = "/var/log/custom/mount.log"
warmup_seconds = 5
"#,
    )
    .expect("config parses");
    assert_eq!(config.ctl_bin, "/usr/local/sbin/gluster");
    assert_eq!(config.mount_log_file, "/var/log/custom/mount.log");
    assert_eq!(config.warmup_seconds, 5);
}

#[test]
fn file_config_rejects_unknown_keys() {
    let err = FileConfig::from_toml_str("interval = 10").unwrap_err();
    assert!(err.to_string().starts_with("config:"));
}

#[test]
fn replica_url_joins_host_and_volume() {
    let config = test_config(10, 0, 60);
    assert_eq!(config.replica_url(), "fvm1::gv2");
}

#[test]
fn replica_url_keeps_user_prefix() {
    let config = SchedulerConfig::new(
        "gv1".into(),
        "geoacct@fvm1".into(),
        "gv2".into(),
        10,
        0,
        FileConfig::default(),
    );
    assert_eq!(config.replica_url(), "geoacct@fvm1::gv2");
}

#[test]
fn zero_timeout_means_unbounded() {
    assert_eq!(test_config(10, 0, 60).timeout, None);
    assert_eq!(
        test_config(10, 2, 60).timeout,
        Some(Duration::from_secs(120))
    );
}

#[test]
fn session_command_addresses_the_pair() {
    let config = test_config(10, 0, 60);
    assert_eq!(
        config.session_command(&["stop", "force"]),
        vec![
            "gluster",
            "volume",
            "geo-replication",
            "gv1",
            "fvm1::gv2",
            "stop",
            "force"
        ]
    );
}
