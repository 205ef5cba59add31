mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use brooklyn_events::cache::EventCache;
use brooklyn_events::pipeline::geocode::Geocoder;
use brooklyn_events::pipeline::normalize::Normalizer;
use brooklyn_events::pipeline::Aggregator;
use brooklyn_events::server::{create_server, AppState};
use brooklyn_events::store::{EventStore, RunStatus};
use brooklyn_events::types::{Coordinates, EventSource};
use common::{raw, wednesday, CountingSource, ManualClock, PanickingSource};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct Harness {
    router: axum::Router,
    calls: Option<Arc<AtomicUsize>>,
    _static_dir: tempfile::TempDir,
}

fn harness(source: Box<dyn EventSource>, calls: Option<Arc<AtomicUsize>>, store: Option<Arc<EventStore>>) -> Harness {
    let clock = Arc::new(ManualClock::at(wednesday()));
    let aggregator = Arc::new(Aggregator::new(
        vec![source],
        Normalizer::default(),
        Geocoder::default(),
        Coordinates {
            lat: 40.6782,
            lng: -73.9712,
        },
        clock.clone(),
    ));
    let cache = Arc::new(EventCache::new(
        aggregator,
        clock.clone(),
        Duration::from_secs(3600),
        None,
    ));
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        static_dir.path().join("index.html"),
        "<html><body>Brooklyn Events</body></html>",
    )
    .unwrap();
    let state = AppState {
        cache,
        store,
        clock,
    };
    Harness {
        router: create_server(state, static_dir.path()),
        calls,
        _static_dir: static_dir,
    }
}

fn weekend_harness() -> Harness {
    let mut jazz = raw("Jazz Night", "2024-06-15T20:00:00", "Bargemusic");
    jazz.event_type = Some("music".into());
    let mut storytime = raw("Storytime", "2024-06-20T10:00:00", "Central Library");
    storytime.event_type = Some("kids".into());
    let (source, calls) = CountingSource::new("counting", vec![jazz, storytime]);
    harness(Box::new(source), Some(calls), None)
}

async fn get_json(router: &axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn events_endpoint_serves_cached_list() {
    let h = weekend_harness();
    let (status, body) = get_json(&h.router, "GET", "/api/events").await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["title"], "Jazz Night");
    assert_eq!(events[0]["type"], "music");
    assert_eq!(events[0]["date"], "2024-06-15T20:00:00");
    assert!(events[0]["coordinates"]["lat"].is_number());
    assert!(body.get("fetched_at").is_none());

    get_json(&h.router, "GET", "/api/events").await;
    assert_eq!(h.calls.as_ref().unwrap().load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_endpoint_forces_aggregation() {
    let h = weekend_harness();
    get_json(&h.router, "GET", "/api/events").await;
    let (status, body) = get_json(&h.router, "POST", "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 2);
    assert!(body["fetched_at"].is_string());
    let (status, _) = get_json(&h.router, "GET", "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.calls.as_ref().unwrap().load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn view_endpoint_buckets_weekend_events() {
    let h = weekend_harness();
    let (status, body) = get_json(&h.router, "GET", "/api/view").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["weekend"][0]["title"], "Jazz Night");
    assert_eq!(body["others"][0]["title"], "Storytime");

    let (_, kids) = get_json(&h.router, "GET", "/api/view?type=kids&sort=distance&order=desc").await;
    assert_eq!(kids["total"], 1);
    assert!(kids["weekend"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failures_return_generic_error() {
    let h = harness(Box::new(PanickingSource), None, None);
    let (status, body) = get_json(&h.router, "GET", "/api/events").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({ "error": "unable to load events" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stats_endpoint_reads_store_when_configured() {
    let h = weekend_harness();
    let (_, empty) = get_json(&h.router, "GET", "/api/stats").await;
    assert_eq!(empty, serde_json::json!([]));

    let store = Arc::new(EventStore::open_in_memory().unwrap());
    store
        .log_scraping_run("wagmag", RunStatus::Success, 3, 3, None)
        .unwrap();
    let (source, _) = CountingSource::new("counting", Vec::new());
    let h = harness(Box::new(source), None, Some(store));
    let (status, stats) = get_json(&h.router, "GET", "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats[0]["source"], "wagmag");
    assert_eq!(stats[0]["total_runs"], 1);
}

#[tokio::test]
async fn health_and_static_client() {
    let h = weekend_harness();
    let (status, body) = get_json(&h.router, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    // Health never aggregates on its own
    assert!(body["cache"].is_null());
    assert_eq!(h.calls.as_ref().unwrap().load(Ordering::SeqCst), 0);

    get_json(&h.router, "GET", "/api/events").await;
    let (_, body) = get_json(&h.router, "GET", "/health").await;
    assert_eq!(body["cache"]["events"], 2);
    assert!(body["cache"]["fetched_at"].is_string());

    let response = h
        .router
        .clone()
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("Brooklyn Events"));
}
