use crate::apis::base::{
    absolute_url, extract_json_ld_events, first_attr, first_text, sample_date, sample_event,
    SourceParser,
};
use crate::constants::{BROOKLYN_LIBRARY_API, BROOKLYN_LIBRARY_URL};
use crate::error::Result;
use crate::types::RawEvent;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

static CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.views-row, article.event, div.event-card").expect("bpl card selector")
});
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h2, h3, .event-title").expect("bpl title selector")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2 a, h3 a, .event-title a").expect("bpl link selector"));
static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("bpl time selector"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-date, .date").expect("bpl date selector"));
static LOCATION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".event-location, .location, .branch").expect("bpl location selector")
});
static SUMMARY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".event-description, .summary, p").expect("bpl summary selector")
});
static AUDIENCE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".audience, .event-audience").expect("bpl audience selector"));

const BRANCHES: [&str; 4] = [
    "Central Library",
    "Prospect Heights Library",
    "Park Slope Library",
    "Fort Greene Library",
];

/// Brooklyn Public Library event listings; plain HTML cards with JSON-LD as a second chance.
pub struct BrooklynLibraryParser;

impl Default for BrooklynLibraryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BrooklynLibraryParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_cards(&self, html: &str) -> Vec<RawEvent> {
        let document = Html::parse_document(html);
        let mut events = Vec::new();

        for card in document.select(&CARD_SELECTOR) {
            let title = match first_text(&card, &TITLE_SELECTOR) {
                Some(title) => title,
                None => continue,
            };
            let date = first_attr(&card, &TIME_SELECTOR, "datetime")
                .or_else(|| first_text(&card, &DATE_SELECTOR));
            let location = first_text(&card, &LOCATION_SELECTOR)
                .map(|branch| format!("{branch}, Brooklyn, NY"));
            // Library audience labels ("Kids", "Teens", "Adults") map onto our types
            let event_type = first_text(&card, &AUDIENCE_SELECTOR);

            events.push(RawEvent {
                title: Some(title),
                date,
                location,
                event_type,
                description: first_text(&card, &SUMMARY_SELECTOR),
                url: absolute_url(BROOKLYN_LIBRARY_URL, first_attr(&card, &LINK_SELECTOR, "href")),
            });
        }
        events
    }
}

impl SourceParser for BrooklynLibraryParser {
    fn source_name(&self) -> &'static str {
        BROOKLYN_LIBRARY_API
    }

    fn url(&self) -> &'static str {
        BROOKLYN_LIBRARY_URL
    }

    fn parse_events(&self, html: &str) -> Result<Vec<RawEvent>> {
        let events = self.parse_cards(html);
        if !events.is_empty() {
            return Ok(events);
        }
        debug!("No library event cards found, trying JSON-LD");
        Ok(extract_json_ld_events(html, BROOKLYN_LIBRARY_URL))
    }

    fn fallback_events(&self, now: NaiveDateTime) -> Vec<RawEvent> {
        BRANCHES
            .iter()
            .enumerate()
            .map(|(i, branch)| {
                sample_event(
                    &format!("Kids Art Workshop at {branch}"),
                    "Free art workshop for children aged 7-12",
                    sample_date(now, 2 + i as i64),
                    &format!("{branch}, Brooklyn, NY"),
                    "kids",
                    BROOKLYN_LIBRARY_URL,
                )
            })
            .collect()
    }
}
