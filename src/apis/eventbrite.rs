use crate::apis::base::{extract_json_ld_events, sample_date, sample_event, SourceParser};
use crate::constants::{EVENTBRITE_MUSIC_API, EVENTBRITE_MUSIC_URL};
use crate::error::Result;
use crate::types::RawEvent;
use chrono::NaiveDateTime;

/// Eventbrite's Brooklyn music browse page. Listings are embedded as a JSON-LD
/// `ItemList`; everything on it is music.
pub struct EventbriteMusicParser;

impl Default for EventbriteMusicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventbriteMusicParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for EventbriteMusicParser {
    fn source_name(&self) -> &'static str {
        EVENTBRITE_MUSIC_API
    }

    fn url(&self) -> &'static str {
        EVENTBRITE_MUSIC_URL
    }

    fn parse_events(&self, html: &str) -> Result<Vec<RawEvent>> {
        let events = extract_json_ld_events(html, EVENTBRITE_MUSIC_URL)
            .into_iter()
            .map(|mut event| {
                event.event_type.get_or_insert_with(|| "music".to_string());
                event
            })
            .collect();
        Ok(events)
    }

    fn fallback_events(&self, now: NaiveDateTime) -> Vec<RawEvent> {
        vec![
            sample_event(
                "Live Jazz Night",
                "Local jazz musicians perform at Brooklyn venue",
                sample_date(now, 3),
                "Brooklyn, NY",
                "music",
                EVENTBRITE_MUSIC_URL,
            ),
            sample_event(
                "Indie Rock Showcase",
                "Brooklyn indie bands performing original music",
                sample_date(now, 7),
                "Brooklyn, NY",
                "music",
                EVENTBRITE_MUSIC_URL,
            ),
        ]
    }
}
