mod common;

use brooklyn_events::cache::EventCache;
use brooklyn_events::pipeline::geocode::Geocoder;
use brooklyn_events::pipeline::normalize::Normalizer;
use brooklyn_events::pipeline::Aggregator;
use brooklyn_events::types::{Coordinates, EventSource};
use chrono::Duration as ChronoDuration;
use common::{raw, wednesday, CountingSource, ManualClock, PanickingSource};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(3600);

fn aggregator(sources: Vec<Box<dyn EventSource>>, clock: Arc<ManualClock>) -> Arc<Aggregator> {
    Arc::new(Aggregator::new(
        sources,
        Normalizer::default(),
        Geocoder::default(),
        Coordinates {
            lat: 40.6782,
            lng: -73.9712,
        },
        clock,
    ))
}

#[tokio::test]
async fn fresh_entry_is_shared_until_ttl_expires() {
    let clock = Arc::new(ManualClock::at(wednesday()));
    let (source, calls) = CountingSource::new(
        "counting",
        vec![raw("Open Studio", "2024-06-15T12:00:00", "Gowanus")],
    );
    let cache = EventCache::new(
        aggregator(vec![Box::new(source)], clock.clone()),
        clock.clone(),
        TTL,
        None,
    );

    let first = cache.get_or_refresh().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.events.len(), 1);

    clock.advance(ChronoDuration::minutes(59));
    let second = cache.get_or_refresh().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.advance(ChronoDuration::minutes(1));
    let third = cache.get_or_refresh().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(third.fetched_at, wednesday() + ChronoDuration::hours(1));
}

#[tokio::test]
async fn forced_refresh_ignores_age() {
    let clock = Arc::new(ManualClock::at(wednesday()));
    let (source, calls) = CountingSource::new("counting", Vec::new());
    let cache = EventCache::new(
        aggregator(vec![Box::new(source)], clock.clone()),
        clock,
        TTL,
        None,
    );

    cache.get_or_refresh().await.unwrap();
    cache.refresh().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_callers_share_one_aggregation() {
    let clock = Arc::new(ManualClock::at(wednesday()));
    let (source, calls) = CountingSource::new(
        "counting",
        vec![raw("Jazz Night", "2024-06-15", "Bargemusic")],
    );
    let cache = Arc::new(EventCache::new(
        aggregator(vec![Box::new(source)], clock.clone()),
        clock,
        TTL,
        None,
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_refresh().await.map(|e| e.events.len()) })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn entry_survives_restart_through_cache_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events_cache.json");
    let clock = Arc::new(ManualClock::at(wednesday()));

    let (source, _) = CountingSource::new(
        "counting",
        vec![raw("Gallery Night", "2024-06-14T18:00:00", "Dumbo")],
    );
    let cache = EventCache::new(
        aggregator(vec![Box::new(source)], clock.clone()),
        clock.clone(),
        TTL,
        Some(path.clone()),
    );
    cache.get_or_refresh().await.unwrap();
    assert!(path.exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["events"][0]["title"], "Gallery Night");
    assert!(json["fetched_at"].is_string());

    // A fresh process with the same file serves it without aggregating
    let (source, calls) = CountingSource::new("counting", Vec::new());
    let restarted = EventCache::new(
        aggregator(vec![Box::new(source)], clock.clone()),
        clock,
        TTL,
        Some(path),
    );
    let entry = restarted.get_or_refresh().await.unwrap();
    assert_eq!(entry.events[0].title, "Gallery Night");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panicking_aggregation_is_an_error_and_keeps_old_entry() {
    let clock = Arc::new(ManualClock::at(wednesday()));
    let cache = EventCache::new(
        aggregator(vec![Box::new(PanickingSource)], clock.clone()),
        clock,
        TTL,
        None,
    );

    let previous = cache.replace(Vec::new()).await;
    assert!(cache.refresh().await.is_err());
    let current = cache.peek().await.unwrap();
    assert!(Arc::ptr_eq(&previous, &current));
}
