//! Topology parsing and per-volume memoization.

use repl_window::topology::TopologyCache;
use repl_window::AppError;

use super::common::{test_config, FakeRunner, TOPOLOGY_XML};

#[tokio::test]
async fn parses_ordered_brick_list() {
    let runner = FakeRunner::new();
    runner.on_ok("volume info", TOPOLOGY_XML);
    let config = test_config(10, 0, 60);

    let mut cache = TopologyCache::new();
    let bricks = cache
        .bricks(&runner, &config, "gv1")
        .await
        .expect("topology parses");

    assert_eq!(bricks.len(), 2);
    assert_eq!(bricks[0].name, "n1:/bricks/b1");
    assert_eq!(bricks[0].host_uuid, "7cbbb1a6-0001");
    assert_eq!(bricks[1].name, "n2:/bricks/b2");
}

#[tokio::test]
async fn second_lookup_is_served_from_cache() {
    let runner = FakeRunner::new();
    runner.on_ok("volume info", TOPOLOGY_XML);
    let config = test_config(10, 0, 60);

    let mut cache = TopologyCache::new();
    let first = cache.bricks(&runner, &config, "gv1").await.expect("first");
    let second = cache.bricks(&runner, &config, "gv1").await.expect("second");

    assert_eq!(first, second);
    assert_eq!(runner.count_matching("volume info"), 1);
}

#[tokio::test]
async fn distinct_volumes_are_cached_separately() {
    let runner = FakeRunner::new();
    runner.on_ok("volume info", TOPOLOGY_XML);
    let config = test_config(10, 0, 60);

    let mut cache = TopologyCache::new();
    cache.bricks(&runner, &config, "gv1").await.expect("gv1");
    cache.bricks(&runner, &config, "other").await.expect("other");
    assert_eq!(runner.count_matching("volume info"), 2);
}

#[tokio::test]
async fn missing_volume_element_is_malformed_output() {
    let runner = FakeRunner::new();
    runner.on_ok("volume info", "<cliOutput><volInfo><volumes/></volInfo></cliOutput>");
    let config = test_config(10, 0, 60);

    let err = TopologyCache::new()
        .bricks(&runner, &config, "gv1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MalformedOutput(_)));
    assert!(err.to_string().contains("volume info"));
}

#[tokio::test]
async fn unparseable_document_is_malformed_output() {
    let runner = FakeRunner::new();
    runner.on_ok("volume info", "Another transaction is in progress");
    let config = test_config(10, 0, 60);

    let err = TopologyCache::new()
        .bricks(&runner, &config, "gv1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MalformedOutput(_)));
}

#[tokio::test]
async fn failed_query_propagates_command_error() {
    let runner = FakeRunner::new();
    runner.on_fail("volume info", "volume gv1 does not exist");
    let config = test_config(10, 0, 60);

    let err = TopologyCache::new()
        .bricks(&runner, &config, "gv1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Command(_)));
}
