//! Prometheus metrics for the aggregation pipeline and cache.
//!
//! The recorder is installed once per process and rendered by the `/metrics` route.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Idempotent.
pub fn init_metrics() {
    if HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_ok() {
                register_all_metrics();
                info!("Prometheus recorder installed");
            }
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Text exposition of every metric, empty when no recorder is installed
pub fn render() -> String {
    HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}

fn register_all_metrics() {
    // Bind to placeholders so they show up before first use
    let _ = counter!("bke_cache_hits_total");
    let _ = counter!("bke_cache_misses_total");
    let _ = histogram!("bke_aggregation_duration_seconds");
}

pub struct SourceMetrics;

impl SourceMetrics {
    pub fn fetched(source: &'static str, count: usize) {
        counter!("bke_source_events_total", "source" => source).increment(count as u64);
    }

    pub fn failure(source: &'static str) {
        counter!("bke_source_failures_total", "source" => source).increment(1);
    }
}

pub struct CacheMetrics;

impl CacheMetrics {
    pub fn hit() {
        counter!("bke_cache_hits_total").increment(1);
    }

    pub fn miss() {
        counter!("bke_cache_misses_total").increment(1);
    }

    pub fn aggregation_duration(secs: f64) {
        histogram!("bke_aggregation_duration_seconds").record(secs);
    }
}
