use crate::apis::base::{
    absolute_url, extract_json_ld_events, first_attr, first_text, sample_date, sample_event,
    SourceParser,
};
use crate::constants::{WAGMAG_API, WAGMAG_URL};
use crate::error::Result;
use crate::types::RawEvent;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static ARTICLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article").expect("wagmag article selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".entry-title").expect("wagmag title selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".entry-title a").expect("wagmag link selector"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("wagmag date selector"));
static VENUE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".event-venue, .venue, .event-location").expect("wagmag venue selector")
});
static SUMMARY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".entry-summary, .entry-content p").expect("wagmag summary selector")
});

/// WAGMAG, the Brooklyn art guide. Gallery listings are WordPress articles.
pub struct WagmagParser;

impl Default for WagmagParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WagmagParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for WagmagParser {
    fn source_name(&self) -> &'static str {
        WAGMAG_API
    }

    fn url(&self) -> &'static str {
        WAGMAG_URL
    }

    fn parse_events(&self, html: &str) -> Result<Vec<RawEvent>> {
        let mut events = extract_json_ld_events(html, WAGMAG_URL);
        let document = Html::parse_document(html);
        for article in document.select(&ARTICLE_SELECTOR) {
            let title = match first_text(&article, &TITLE_SELECTOR) {
                Some(title) => title,
                None => continue,
            };
            // Articles that only repeat a JSON-LD event add nothing
            if events
                .iter()
                .any(|e| e.title.as_deref().map_or(false, |t| t.eq_ignore_ascii_case(&title)))
            {
                continue;
            }
            events.push(RawEvent {
                title: Some(title),
                date: first_attr(&article, &DATE_SELECTOR, "datetime"),
                location: Some(
                    first_text(&article, &VENUE_SELECTOR)
                        .unwrap_or_else(|| "Brooklyn, NY".to_string()),
                ),
                event_type: None,
                description: first_text(&article, &SUMMARY_SELECTOR),
                url: absolute_url(WAGMAG_URL, first_attr(&article, &LINK_SELECTOR, "href")),
            });
        }
        for event in &mut events {
            event.event_type.get_or_insert_with(|| "art".to_string());
        }
        Ok(events)
    }

    fn fallback_events(&self, now: NaiveDateTime) -> Vec<RawEvent> {
        vec![
            sample_event(
                "Contemporary Art Gallery Opening",
                "New exhibition featuring emerging Brooklyn artists",
                sample_date(now, 2),
                "Williamsburg, Brooklyn, NY",
                "art",
                WAGMAG_URL,
            ),
            sample_event(
                "Photography Exhibit",
                "Black and white street photography of Brooklyn",
                sample_date(now, 6),
                "Red Hook, Brooklyn, NY",
                "art",
                WAGMAG_URL,
            ),
        ]
    }
}
