use crate::apis::base::{extract_json_ld_events, sample_date, sample_event, SourceParser};
use crate::constants::{BROOKLYN_PAPER_API, BROOKLYN_PAPER_URL};
use crate::error::Result;
use crate::types::RawEvent;
use chrono::NaiveDateTime;

/// Brooklyn Paper's community calendar publishes schema.org events as JSON-LD.
pub struct BrooklynPaperParser;

impl Default for BrooklynPaperParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BrooklynPaperParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for BrooklynPaperParser {
    fn source_name(&self) -> &'static str {
        BROOKLYN_PAPER_API
    }

    fn url(&self) -> &'static str {
        BROOKLYN_PAPER_URL
    }

    fn parse_events(&self, html: &str) -> Result<Vec<RawEvent>> {
        Ok(extract_json_ld_events(html, BROOKLYN_PAPER_URL))
    }

    fn fallback_events(&self, now: NaiveDateTime) -> Vec<RawEvent> {
        vec![sample_event(
            "Brooklyn Paper Family Festival",
            "Community festival with activities for all ages",
            sample_date(now, 5),
            "Prospect Park, Brooklyn, NY",
            "kids",
            BROOKLYN_PAPER_URL,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calendar_json_ld() {
        let html = r#"<html><head><script type="application/ld+json">
            [{"@context":"https://schema.org","@type":"Event","name":"Stoop Sale Saturday",
              "startDate":"2024-06-15T10:00:00-04:00","location":{"@type":"Place","name":"Fort Greene Park"},
              "url":"https://events.brooklynpaper.com/e/stoop-sale"}]
        </script></head><body></body></html>"#;

        let events = BrooklynPaperParser::new().parse_events(html).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title.as_deref(), Some("Stoop Sale Saturday"));
        assert_eq!(events[0].location.as_deref(), Some("Fort Greene Park"));
        assert_eq!(
            events[0].url.as_deref(),
            Some("https://events.brooklynpaper.com/e/stoop-sale")
        );
    }

    #[test]
    fn fallback_is_dated_relative_to_now() {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 6, 12)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let events = BrooklynPaperParser::new().fallback_events(now);
        assert_eq!(events[0].date.as_deref(), Some("2024-06-17T09:00:00"));
    }
}
