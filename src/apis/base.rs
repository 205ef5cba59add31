use crate::app::ports::HttpClientPort;
use crate::error::{Result, ScraperError};
use crate::metrics::SourceMetrics;
use crate::types::{EventSource, RawEvent, SourceBatch};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("json-ld selector")
});

/// Site-specific extraction logic. The crawler owns fetching and failure handling.
pub trait SourceParser: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Fixed listing page for this source
    fn url(&self) -> &'static str;

    /// Parse a listing page into raw records
    fn parse_events(&self, html: &str) -> Result<Vec<RawEvent>>;

    /// Illustrative records served when the live fetch fails
    fn fallback_events(&self, _now: NaiveDateTime) -> Vec<RawEvent> {
        Vec::new()
    }
}

/// Base crawler that implements EventSource using a site-specific parser
pub struct BaseCrawler {
    http: Arc<dyn HttpClientPort>,
    parser: Box<dyn SourceParser>,
    fallback_samples: bool,
}

impl BaseCrawler {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        parser: Box<dyn SourceParser>,
        fallback_samples: bool,
    ) -> Self {
        Self {
            http,
            parser,
            fallback_samples,
        }
    }

    async fn fetch_live(&self) -> Result<Vec<RawEvent>> {
        let url = self.parser.url();
        let response = self.http.get(url).await?;
        if !response.is_success() {
            return Err(ScraperError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }
        let body = response.text();
        self.parser.parse_events(&body)
    }

    fn degrade(&self, now: NaiveDateTime, reason: String) -> SourceBatch {
        let name = self.parser.source_name();
        SourceMetrics::failure(name);
        if self.fallback_samples {
            let events = self.parser.fallback_events(now);
            warn!(
                "{} unavailable ({}); serving {} sample records",
                name,
                reason,
                events.len()
            );
            SourceBatch::placeholder(name, events, Some(reason))
        } else {
            warn!("{} unavailable ({}); contributing nothing", name, reason);
            SourceBatch::placeholder(name, Vec::new(), Some(reason))
        }
    }
}

#[async_trait::async_trait]
impl EventSource for BaseCrawler {
    fn source_name(&self) -> &'static str {
        self.parser.source_name()
    }

    #[instrument(skip(self), fields(source = %self.parser.source_name()))]
    async fn fetch(&self, now: NaiveDateTime) -> SourceBatch {
        match self.fetch_live().await {
            Ok(events) if !events.is_empty() => {
                info!(
                    "Successfully fetched {} events from {}",
                    events.len(),
                    self.parser.source_name()
                );
                SourceMetrics::fetched(self.parser.source_name(), events.len());
                SourceBatch::live(self.parser.source_name(), events)
            }
            Ok(_) => self.degrade(
                now,
                "no events found - the page structure may have changed".to_string(),
            ),
            Err(e) => self.degrade(now, e.to_string()),
        }
    }
}

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

pub fn absolute_url(base: &str, href: Option<String>) -> Option<String> {
    let href = href?;
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href);
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(&href).ok().map(|u| u.to_string())
}

/// ISO timestamp `days` after `now`, the shape sample records carry
pub fn sample_date(now: NaiveDateTime, days: i64) -> String {
    (now + chrono::Duration::days(days))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Build an illustrative record for fallback data
pub fn sample_event(
    title: &str,
    description: &str,
    date: String,
    location: &str,
    event_type: &str,
    url: &str,
) -> RawEvent {
    RawEvent {
        title: Some(title.to_string()),
        date: Some(date),
        location: Some(location.to_string()),
        event_type: Some(event_type.to_string()),
        description: Some(description.to_string()),
        url: Some(url.to_string()),
    }
}

/// Collect every schema.org Event embedded as JSON-LD in the page. Relative
/// `url` values are resolved against `base_url`.
pub fn extract_json_ld_events(html: &str, base_url: &str) -> Vec<RawEvent> {
    let document = Html::parse_document(html);
    let mut events = Vec::new();
    for script in document.select(&JSON_LD_SELECTOR) {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => collect_json_ld(&value, base_url, &mut events),
            Err(e) => debug!("Skipping malformed JSON-LD block: {}", e),
        }
    }
    events
}

fn collect_json_ld(value: &Value, base_url: &str, out: &mut Vec<RawEvent>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_json_ld(item, base_url, out);
            }
        }
        Value::Object(obj) => {
            if obj.get("@type").map_or(false, is_event_type) {
                if let Some(event) = raw_event_from_json_ld(obj, base_url) {
                    out.push(event);
                }
            }
            if let Some(graph) = obj.get("@graph") {
                collect_json_ld(graph, base_url, out);
            }
            if let Some(Value::Array(elements)) = obj.get("itemListElement") {
                for element in elements {
                    collect_json_ld(element.get("item").unwrap_or(element), base_url, out);
                }
            }
        }
        _ => {}
    }
}

fn is_event_type(value: &Value) -> bool {
    match value {
        Value::String(s) => s.ends_with("Event"),
        Value::Array(types) => types.iter().any(is_event_type),
        _ => false,
    }
}

fn json_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

fn json_ld_location(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)).filter(|s| !s.is_empty()),
        Value::Array(places) => places.iter().find_map(json_ld_location),
        Value::Object(place) => {
            let name = json_str(place, "name");
            let address = match place.get("address") {
                Some(Value::String(s)) => Some(clean_text(s)),
                Some(Value::Object(addr)) => {
                    let parts: Vec<String> = ["streetAddress", "addressLocality", "addressRegion"]
                        .iter()
                        .filter_map(|k| json_str(addr, k))
                        .collect();
                    Some(parts.join(", "))
                }
                _ => None,
            }
            .filter(|s| !s.is_empty());
            match (name, address) {
                (Some(name), Some(address)) if !address.contains(&name) => {
                    Some(format!("{name}, {address}"))
                }
                (Some(name), None) => Some(name),
                (_, Some(address)) => Some(address),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

fn raw_event_from_json_ld(obj: &Map<String, Value>, base_url: &str) -> Option<RawEvent> {
    let title = json_str(obj, "name")?;
    Some(RawEvent {
        title: Some(title),
        date: json_str(obj, "startDate"),
        location: obj.get("location").and_then(json_ld_location),
        event_type: None,
        description: json_str(obj, "description"),
        url: absolute_url(base_url, json_str(obj, "url")),
    })
}
