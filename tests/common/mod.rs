#![allow(dead_code)]

use async_trait::async_trait;
use brooklyn_events::app::ports::{ClockPort, HttpClientPort, HttpGetResult};
use brooklyn_events::error::{Result, ScraperError};
use brooklyn_events::types::{EventSource, RawEvent, SourceBatch};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Canned responses keyed by URL; anything else is a connection error.
#[derive(Default)]
pub struct StubHttp {
    responses: HashMap<String, (u16, String)>,
    pub requests: AtomicUsize,
}

impl StubHttp {
    pub fn with(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), (status, body.to_string()));
        self
    }
}

#[async_trait]
impl HttpClientPort for StubHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some((status, body)) => Ok(HttpGetResult {
                status: *status,
                bytes: body.as_bytes().to_vec(),
                content_type: "text/html".into(),
            }),
            None => Err(ScraperError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("connection refused: {url}"),
            ))),
        }
    }
}

/// Clock that only moves when told to
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Wednesday 2024-06-12 at 16:00 UTC
pub fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 16, 0, 0).unwrap()
}

pub fn raw(title: &str, date: &str, location: &str) -> RawEvent {
    RawEvent {
        title: Some(title.into()),
        date: Some(date.into()),
        location: Some(location.into()),
        ..Default::default()
    }
}

/// Source returning fixed records and counting how often it is asked
pub struct CountingSource {
    pub name: &'static str,
    pub events: Vec<RawEvent>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(name: &'static str, events: Vec<RawEvent>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                events,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl EventSource for CountingSource {
    fn source_name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _now: NaiveDateTime) -> SourceBatch {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SourceBatch::live(self.name, self.events.clone())
    }
}

/// Source that blows up mid-fetch
pub struct PanickingSource;

#[async_trait]
impl EventSource for PanickingSource {
    fn source_name(&self) -> &'static str {
        "panicking"
    }

    async fn fetch(&self, _now: NaiveDateTime) -> SourceBatch {
        panic!("selector exploded")
    }
}
