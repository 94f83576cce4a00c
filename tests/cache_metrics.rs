mod common;

use std::collections::HashSet;
use std::sync::OnceLock;

use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use serial_test::serial;

use catalogd::infra::telemetry;

use common::{TestApp, chair, estate};

fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        telemetry::describe_metrics();
        snapshotter
    })
}

fn metric_names() -> HashSet<String> {
    snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect()
}

#[tokio::test]
#[serial]
async fn cache_paths_emit_expected_metric_keys() {
    snapshotter();
    let app = TestApp::new(vec![chair(1, 1000, 1, 2)], vec![estate(1, 50000, 1)]).await;

    app.get("/api/chair/1").await;
    app.get("/api/chair/2").await;
    app.get("/api/chair/search?priceRangeId=0&page=0&perPage=20")
        .await;
    app.get("/api/chair/search?priceRangeId=0&page=0&perPage=20")
        .await;
    app.get("/api/chair/low_priced").await;
    app.post_json("/api/chair/buy/1", r#"{"email":"a@example.com"}"#)
        .await;

    let names = metric_names();
    let expected = [
        "catalogd_cache_object_hit_total",
        "catalogd_cache_object_miss_total",
        "catalogd_cache_query_hit_total",
        "catalogd_cache_query_miss_total",
        "catalogd_cache_flush_total",
        "catalogd_cache_coalesce_leader_total",
        "catalogd_search_ms",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn joined_flights_are_counted() {
    snapshotter();
    let app = TestApp::from_repos(
        common::MemoryRepo::with_delay(
            vec![chair(1, 1000, 1, 1)],
            std::time::Duration::from_millis(100),
        ),
        common::MemoryRepo::new(Vec::new()),
    )
    .await;

    tokio::join!(
        app.get("/api/chair/low_priced"),
        app.get("/api/chair/low_priced")
    );

    assert!(metric_names().contains("catalogd_cache_coalesce_joined_total"));
}
