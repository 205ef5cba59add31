use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category used for both filtering and CSS class labelling in the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Art,
    Music,
    Kids,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Art => "art",
            EventType::Music => "music",
            EventType::Kids => "kids",
            EventType::Other => "other",
        }
    }

    /// Lenient coercion from whatever a source calls its category.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "art" | "arts" | "exhibit" | "exhibition" | "gallery" => EventType::Art,
            "music" | "concert" | "jazz" => EventType::Music,
            "kids" | "kid" | "family" | "children" => EventType::Kids,
            _ => EventType::Other,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Normalized event served to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    /// Local wall-clock time
    pub date: Option<NaiveDateTime>,
    pub location: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Miles from the reference point
    #[serde(default)]
    pub distance: Option<f64>,
    /// False for placeholder records that did not come from a live fetch
    #[serde(default = "default_live")]
    pub live: bool,
}

fn default_live() -> bool {
    true
}

/// Loosely typed record as pulled off a page, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub title: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub event_type: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// What one source contributed to an aggregation run
#[derive(Debug, Clone, Serialize)]
pub struct SourceBatch {
    pub source: String,
    pub events: Vec<RawEvent>,
    pub live: bool,
    pub error: Option<String>,
}

impl SourceBatch {
    pub fn live(source: &str, events: Vec<RawEvent>) -> Self {
        Self {
            source: source.to_string(),
            events,
            live: true,
            error: None,
        }
    }

    pub fn placeholder(source: &str, events: Vec<RawEvent>, error: Option<String>) -> Self {
        Self {
            source: source.to_string(),
            events,
            live: false,
            error,
        }
    }
}

/// Core trait that all event sources must implement
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Unique identifier for this source
    fn source_name(&self) -> &'static str;

    /// Fetch everything this source has. Never fails: errors degrade to
    /// fallback records or an empty batch.
    async fn fetch(&self, now: NaiveDateTime) -> SourceBatch;
}
