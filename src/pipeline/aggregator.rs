use crate::apis::factory::create_sources;
use crate::app::ports::{ClockPort, HttpClientPort};
use crate::config::Config;
use crate::pipeline::distance::haversine_miles;
use crate::pipeline::geocode::Geocoder;
use crate::pipeline::normalize::Normalizer;
use crate::types::{Coordinates, Event, EventSource, SourceBatch};
use chrono::Local;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Per-source outcome of one aggregation run
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub found: usize,
    pub accepted: usize,
    pub live: bool,
    pub error: Option<String>,
}

/// Result of a complete aggregation run
#[derive(Debug, Clone, Serialize)]
pub struct AggregationResult {
    pub events: Vec<Event>,
    pub sources: Vec<SourceReport>,
    pub duplicates: usize,
}

/// Merge, dedupe, geocode and distance-annotate the output of every source.
pub struct Aggregator {
    sources: Vec<Box<dyn EventSource>>,
    normalizer: Normalizer,
    geocoder: Geocoder,
    reference: Coordinates,
    clock: Arc<dyn ClockPort>,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Box<dyn EventSource>>,
        normalizer: Normalizer,
        geocoder: Geocoder,
        reference: Coordinates,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            sources,
            normalizer,
            geocoder,
            reference,
            clock,
        }
    }

    pub fn from_config(
        config: &Config,
        http: Arc<dyn HttpClientPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let sources = create_sources(
            &config.sources.enabled,
            http,
            config.sources.fallback_samples,
        );
        Self::new(
            sources,
            Normalizer::new(config.normalization.clone()),
            Geocoder::from_config(&config.geocode),
            Coordinates {
                lat: config.reference.lat,
                lng: config.reference.lng,
            },
            clock,
        )
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.source_name()).collect()
    }

    /// Run every source in registration order and merge the results. Never fails.
    #[instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn aggregate(&self) -> AggregationResult {
        let now = self.clock.now().with_timezone(&Local).naive_local();
        let mut batches = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            debug!("Fetching from {}", source.source_name());
            batches.push(source.fetch(now).await);
        }
        let result = self.merge(batches);
        info!(
            "Aggregated {} events from {} sources ({} duplicates dropped)",
            result.events.len(),
            result.sources.len(),
            result.duplicates
        );
        result
    }

    /// Pure merge step: normalize, dedupe (first-seen wins), geocode, measure.
    pub fn merge(&self, batches: Vec<SourceBatch>) -> AggregationResult {
        let mut events: Vec<Event> = Vec::new();
        let mut index_by_key: HashMap<String, usize> = HashMap::new();
        let mut reports = Vec::with_capacity(batches.len());
        let mut duplicates = 0;

        for batch in batches {
            let mut accepted = 0;
            for raw in &batch.events {
                let event = match self.normalizer.to_event(raw, &batch.source, batch.live) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Dropping record from {}: {}", batch.source, e);
                        continue;
                    }
                };
                accepted += 1;

                let key = self.normalizer.identity_key(&event);
                match index_by_key.get(&key) {
                    Some(&existing) => {
                        duplicates += 1;
                        debug!(
                            "Duplicate '{}' from {} merged into {} record",
                            event.title, event.source, events[existing].source
                        );
                        let kept = &mut events[existing];
                        if kept.description.is_none() {
                            kept.description = event.description;
                        }
                        if kept.url.is_none() {
                            kept.url = event.url;
                        }
                    }
                    None => {
                        index_by_key.insert(key, events.len());
                        events.push(event);
                    }
                }
            }
            reports.push(SourceReport {
                source: batch.source,
                found: batch.events.len(),
                accepted,
                live: batch.live,
                error: batch.error,
            });
        }

        self.annotate_locations(&mut events);

        AggregationResult {
            events,
            sources: reports,
            duplicates,
        }
    }

    fn annotate_locations(&self, events: &mut [Event]) {
        // Each distinct location string is geocoded once
        let mut resolved: HashMap<String, Option<Coordinates>> = HashMap::new();
        for event in events.iter_mut() {
            let coordinates = *resolved
                .entry(event.location.clone())
                .or_insert_with(|| self.geocoder.lookup(&event.location));
            event.coordinates = coordinates;
            event.distance = coordinates.map(|c| haversine_miles(self.reference, c));
        }
    }
}
