use crate::apis::base::clean_text;
use crate::config::{DatePrecision, NormalizationConfig};
use crate::error::{Result, ScraperError};
use crate::types::{Event, EventType, RawEvent};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static KIDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(kids?|children'?s?|family|families|toddlers?|storytime)\b")
        .expect("valid kids regex")
});
static MUSIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(music|jazz|concert|band|bands|quartet|dj|orchestra|rock|live set)\b")
        .expect("valid music regex")
});
static ART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(art|arts|gallery|exhibit|exhibition|photography|sculpture|painting|installation)\b")
        .expect("valid art regex")
});

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%m/%d/%Y"];

/// Parse whatever a source put in its date field into local wall-clock time.
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let text = clean_text(input);
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Best-effort category from free text, kids first since family events are
/// often also art or music.
pub fn infer_type(text: &str) -> EventType {
    if KIDS_RE.is_match(text) {
        EventType::Kids
    } else if MUSIC_RE.is_match(text) {
        EventType::Music
    } else if ART_RE.is_match(text) {
        EventType::Art
    } else {
        EventType::Other
    }
}

fn clean_optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| clean_text(&TAG_RE.replace_all(v, " ")))
        .filter(|v| !v.is_empty())
}

/// Coerces raw records into `Event` and derives deduplication keys.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizationConfig,
}

impl Normalizer {
    pub fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }

    /// Validate a raw record at the adapter boundary. Only the title is required.
    pub fn to_event(&self, raw: &RawEvent, source: &str, live: bool) -> Result<Event> {
        let title = clean_optional(raw.title.as_ref())
            .ok_or_else(|| ScraperError::MissingField("title not found".into()))?;
        let description = clean_optional(raw.description.as_ref());

        let inferred = || {
            infer_type(&format!(
                "{} {}",
                title,
                description.as_deref().unwrap_or_default()
            ))
        };
        // Labels we can't map (audiences like "Adults") say nothing about the category
        let event_type = match raw.event_type.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => match EventType::from_label(label) {
                EventType::Other if !label.eq_ignore_ascii_case("other") => inferred(),
                mapped => mapped,
            },
            _ => inferred(),
        };

        Ok(Event {
            title,
            date: raw.date.as_deref().and_then(parse_date),
            location: clean_optional(raw.location.as_ref()).unwrap_or_default(),
            event_type,
            description,
            url: clean_optional(raw.url.as_ref()),
            source: source.to_string(),
            coordinates: None,
            distance: None,
            live,
        })
    }

    /// Case-folded, whitespace-collapsed text; punctuation removed when configured.
    pub fn normalize_text(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let kept: String = if self.config.strip_punctuation {
            lowered
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect()
        } else {
            lowered
        };
        clean_text(&kept)
    }

    pub fn normalize_date(&self, date: Option<NaiveDateTime>) -> String {
        match (date, self.config.date_precision) {
            (None, _) => String::new(),
            (Some(date), DatePrecision::Day) => date.format("%Y-%m-%d").to_string(),
            (Some(date), DatePrecision::Minute) => date.format("%Y-%m-%dT%H:%M").to_string(),
        }
    }

    /// Identity used for cross-source deduplication: title + date + venue
    pub fn identity_key(&self, event: &Event) -> String {
        format!(
            "{}|{}|{}",
            self.normalize_text(&event.title),
            self.normalize_date(event.date),
            self.normalize_text(&event.location)
        )
    }
}
