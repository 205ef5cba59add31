use crate::apis::base::{BaseCrawler, SourceParser};
use crate::apis::brooklyn_library::BrooklynLibraryParser;
use crate::apis::brooklyn_paper::BrooklynPaperParser;
use crate::apis::eventbrite::EventbriteMusicParser;
use crate::apis::nyc_sample::NycSampleSource;
use crate::apis::wagmag::WagmagParser;
use crate::app::ports::HttpClientPort;
use crate::constants::*;
use crate::types::EventSource;
use std::sync::Arc;
use tracing::warn;

/// Factory function to create parsers directly
pub fn create_parser(source_name: &str) -> Option<Box<dyn SourceParser>> {
    match source_name {
        BROOKLYN_PAPER_API => Some(Box::new(BrooklynPaperParser::new())),
        BROOKLYN_LIBRARY_API => Some(Box::new(BrooklynLibraryParser::new())),
        EVENTBRITE_MUSIC_API => Some(Box::new(EventbriteMusicParser::new())),
        WAGMAG_API => Some(Box::new(WagmagParser::new())),
        _ => None,
    }
}

/// Factory function to create a source by name
pub fn create_source(
    source_name: &str,
    http: Arc<dyn HttpClientPort>,
    fallback_samples: bool,
) -> Option<Box<dyn EventSource>> {
    if source_name == NYC_SAMPLE_API {
        return Some(Box::new(NycSampleSource::new()));
    }
    create_parser(source_name)
        .map(|parser| Box::new(BaseCrawler::new(http, parser, fallback_samples)) as Box<dyn EventSource>)
}

/// Build the enabled sources in the given order, skipping unknown names
pub fn create_sources(
    names: &[String],
    http: Arc<dyn HttpClientPort>,
    fallback_samples: bool,
) -> Vec<Box<dyn EventSource>> {
    names
        .iter()
        .filter_map(|name| {
            let source = create_source(name.trim(), http.clone(), fallback_samples);
            if source.is_none() {
                warn!("Unknown source '{}' in configuration, skipping", name);
            }
            source
        })
        .collect()
}
