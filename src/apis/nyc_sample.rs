use crate::apis::base::{sample_date, sample_event};
use crate::constants::NYC_SAMPLE_API;
use crate::types::{EventSource, RawEvent, SourceBatch};
use chrono::{Datelike, NaiveDateTime};
use tracing::info;

const PLACEHOLDER_URL: &str = "https://example.com";

/// Stand-in for a city open-data feed. It has no live endpoint, so every
/// record it returns is labelled non-live.
pub struct NycSampleSource;

impl Default for NycSampleSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NycSampleSource {
    pub fn new() -> Self {
        Self
    }

    pub fn sample_events(now: NaiveDateTime) -> Vec<RawEvent> {
        let mut events = vec![
            sample_event(
                "Contemporary Art Gallery Opening",
                "Exhibition of modern art by emerging Brooklyn artists",
                sample_date(now, 2),
                "132 Grand St, Williamsburg, Brooklyn, NY 11249",
                "art",
                PLACEHOLDER_URL,
            ),
            sample_event(
                "Jazz Night at Blue Note Brooklyn",
                "Live jazz performance featuring local musicians",
                sample_date(now, 3),
                "Williamsburg, Brooklyn, NY 11249",
                "music",
                PLACEHOLDER_URL,
            ),
            sample_event(
                "Kids Art Workshop at Brooklyn Children's Museum",
                "Interactive art workshop for kids aged 7-12",
                sample_date(now, 4),
                "Brooklyn Children's Museum, 145 Brooklyn Ave, Brooklyn, NY 11213",
                "kids",
                "https://www.brooklynkids.org/",
            ),
            sample_event(
                "Photography Exhibit: Brooklyn Streets",
                "Black and white photography exhibition showcasing Brooklyn street scenes",
                sample_date(now, 5),
                "123 Flatbush Ave, Brooklyn, NY 11217",
                "art",
                PLACEHOLDER_URL,
            ),
            sample_event(
                "Indie Rock Concert at Music Hall",
                "Local indie bands performing original music",
                sample_date(now, 6),
                "456 7th Ave, Park Slope, Brooklyn, NY 11215",
                "music",
                PLACEHOLDER_URL,
            ),
            sample_event(
                "Sculpture Garden Installation Opening",
                "Outdoor sculpture exhibition in Prospect Park",
                sample_date(now, 7),
                "Prospect Park, Brooklyn, NY",
                "art",
                "https://www.prospectpark.org/",
            ),
            sample_event(
                "Classical Music Concert at Brooklyn Museum",
                "String quartet performing classical favorites",
                sample_date(now, 8),
                "Brooklyn Museum, 200 Eastern Pkwy, Brooklyn, NY 11238",
                "music",
                "https://www.brooklynmuseum.org/",
            ),
            sample_event(
                "Abstract Painting Workshop",
                "Adult painting class focusing on abstract techniques",
                sample_date(now, 9),
                "789 Atlantic Ave, Boerum Hill, Brooklyn, NY 11238",
                "art",
                PLACEHOLDER_URL,
            ),
        ];

        // Always show something in the weekend bucket: the coming Saturday,
        // or next week's when today is already Saturday
        let days_until_saturday = match (5 - now.weekday().num_days_from_monday() as i64).rem_euclid(7) {
            0 => 7,
            n => n,
        };
        events.extend([
            sample_event(
                "Weekend Art Walk in Prospect Heights",
                "Self-guided art gallery tour featuring local artists",
                sample_date(now, days_until_saturday),
                "Prospect Heights, Brooklyn, NY",
                "art",
                PLACEHOLDER_URL,
            ),
            sample_event(
                "Sunday Jazz Brunch at Brooklyn Museum",
                "Live jazz music with brunch at the museum cafe",
                sample_date(now, days_until_saturday + 1),
                "Brooklyn Museum, 200 Eastern Pkwy, Brooklyn, NY 11238",
                "music",
                "https://www.brooklynmuseum.org/",
            ),
            sample_event(
                "Kids Weekend Workshop: Clay Sculpting",
                "Hands-on clay sculpting workshop for kids aged 7-12",
                sample_date(now, days_until_saturday),
                "Park Slope Library, Brooklyn, NY",
                "kids",
                PLACEHOLDER_URL,
            ),
        ]);
        events
    }
}

#[async_trait::async_trait]
impl EventSource for NycSampleSource {
    fn source_name(&self) -> &'static str {
        NYC_SAMPLE_API
    }

    async fn fetch(&self, now: NaiveDateTime) -> SourceBatch {
        let events = Self::sample_events(now);
        info!("Serving {} sample events", events.len());
        SourceBatch::placeholder(NYC_SAMPLE_API, events, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn weekend_samples_land_on_the_coming_saturday() {
        // 2024-06-12 is a Wednesday
        let events = NycSampleSource::sample_events(at(2024, 6, 12));
        let walk = events
            .iter()
            .find(|e| e.title.as_deref() == Some("Weekend Art Walk in Prospect Heights"))
            .unwrap();
        assert_eq!(walk.date.as_deref(), Some("2024-06-15T12:00:00"));
    }

    #[test]
    fn on_saturday_samples_move_to_next_week() {
        let saturday = at(2024, 6, 15);
        assert_eq!(saturday.weekday(), Weekday::Sat);
        let events = NycSampleSource::sample_events(saturday);
        let brunch = events
            .iter()
            .find(|e| e.title.as_deref() == Some("Sunday Jazz Brunch at Brooklyn Museum"))
            .unwrap();
        assert_eq!(brunch.date.as_deref(), Some("2024-06-23T12:00:00"));
    }

    #[tokio::test]
    async fn batches_are_never_live() {
        let batch = NycSampleSource::new().fetch(at(2024, 6, 12)).await;
        assert!(!batch.live);
        assert_eq!(batch.events.len(), 11);
        assert!(batch.error.is_none());
    }
}
