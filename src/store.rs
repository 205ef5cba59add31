//! SQLite persistence for aggregated events and a log of scraping runs.
//!
//! The HTTP API serves from the cache; this store backs the scheduled `scrape`
//! job, `prune`, and the statistics endpoint.

use crate::error::Result;
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::SourceReport;
use crate::types::{Coordinates, Event, EventType};
use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Fallback,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Fallback => "fallback",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_report(report: &SourceReport) -> Self {
        match (report.live, report.error.is_some(), report.accepted) {
            (true, _, _) => RunStatus::Success,
            // Sample-only sources never fail
            (false, false, _) => RunStatus::Success,
            (false, true, n) if n > 0 => RunStatus::Fallback,
            (false, true, _) => RunStatus::Failed,
        }
    }
}

/// Aggregate row of the `scraping_runs` table for one source
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub total_runs: i64,
    pub successful_runs: i64,
    pub total_events_found: i64,
    pub total_events_added: i64,
    pub last_run: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpcomingFilter {
    pub min_date: Option<NaiveDateTime>,
    pub max_date: Option<NaiveDateTime>,
    pub event_type: Option<EventType>,
    pub limit: Option<usize>,
}

pub struct EventStore {
    conn: Mutex<Connection>,
    normalizer: Normalizer,
}

/// Stable per-event key: hex SHA-256 of the deduplication identity key
pub fn source_id(identity_key: &str) -> String {
    hex::encode(Sha256::digest(identity_key.as_bytes()))
}

impl EventStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                description TEXT,
                date        TEXT,
                location    TEXT NOT NULL,
                latitude    REAL,
                longitude   REAL,
                distance    REAL,
                type        TEXT NOT NULL,
                url         TEXT,
                source      TEXT NOT NULL,
                source_id   TEXT NOT NULL,
                live        INTEGER NOT NULL DEFAULT 1,
                created_at  TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at  TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(source, source_id)
            );
            CREATE INDEX IF NOT EXISTS idx_date ON events(date);
            CREATE INDEX IF NOT EXISTS idx_type ON events(type);
            CREATE INDEX IF NOT EXISTS idx_source ON events(source);
            CREATE INDEX IF NOT EXISTS idx_distance ON events(distance);
            CREATE TABLE IF NOT EXISTS scraping_runs (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                source        TEXT NOT NULL,
                status        TEXT NOT NULL,
                events_found  INTEGER DEFAULT 0,
                events_added  INTEGER DEFAULT 0,
                error_message TEXT,
                started_at    TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                completed_at  TIMESTAMP
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            normalizer: Normalizer::default(),
        })
    }

    /// Use the same identity rules as the aggregator when keying rows.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-call; the connection is still usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or update each event keyed on (source, source_id). Returns rows written.
    pub fn upsert_events(&self, events: &[Event]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO events
                    (title, description, date, location, latitude, longitude, distance,
                     type, url, source, source_id, live)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(source, source_id) DO UPDATE SET
                    title=excluded.title, description=excluded.description, date=excluded.date,
                    location=excluded.location, latitude=excluded.latitude,
                    longitude=excluded.longitude, distance=excluded.distance, type=excluded.type,
                    url=excluded.url, live=excluded.live, updated_at=CURRENT_TIMESTAMP",
            )?;
            for event in events {
                written += stmt.execute(params![
                    event.title,
                    event.description,
                    event.date.map(|d| d.format(DATE_FORMAT).to_string()),
                    event.location,
                    event.coordinates.map(|c| c.lat),
                    event.coordinates.map(|c| c.lng),
                    event.distance,
                    event.event_type.as_str(),
                    event.url,
                    event.source,
                    source_id(&self.normalizer.identity_key(event)),
                    event.live,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Upserted {} events", written);
        Ok(written)
    }

    /// Dated events from `min_date` (default: now) onward, soonest first.
    pub fn upcoming_events(&self, filter: &UpcomingFilter, now: NaiveDateTime) -> Result<Vec<Event>> {
        let min_date = filter.min_date.unwrap_or(now).format(DATE_FORMAT).to_string();
        let max_date = filter.max_date.map(|d| d.format(DATE_FORMAT).to_string());
        let event_type = filter.event_type.map(|t| t.as_str());
        let limit = filter.limit.unwrap_or(100) as i64;

        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT title, description, date, location, latitude, longitude, distance,
                    type, url, source, live
             FROM events
             WHERE date IS NOT NULL AND date >= ?1
               AND (?2 IS NULL OR date <= ?2)
               AND (?3 IS NULL OR type = ?3)
             ORDER BY date ASC
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(params![min_date, max_date, event_type, limit], event_from_row)?;
        let events = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Delete events dated more than `days` before `now`.
    pub fn delete_old_events(&self, days: i64, now: NaiveDateTime) -> Result<usize> {
        let cutoff = (now - Duration::days(days)).format(DATE_FORMAT).to_string();
        let deleted = self
            .conn()
            .execute("DELETE FROM events WHERE date < ?1", params![cutoff])?;
        info!("Deleted {} events older than {}", deleted, cutoff);
        Ok(deleted)
    }

    pub fn log_scraping_run(
        &self,
        source: &str,
        status: RunStatus,
        events_found: usize,
        events_added: usize,
        error_message: Option<&str>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO scraping_runs
                (source, status, events_found, events_added, error_message, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)",
            params![
                source,
                status.as_str(),
                events_found as i64,
                events_added as i64,
                error_message
            ],
        )?;
        Ok(())
    }

    pub fn scraping_stats(&self) -> Result<Vec<SourceStats>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT source,
                    COUNT(*),
                    SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END),
                    SUM(events_found),
                    SUM(events_added),
                    MAX(completed_at)
             FROM scraping_runs
             GROUP BY source
             ORDER BY source",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SourceStats {
                source: row.get(0)?,
                total_runs: row.get(1)?,
                successful_runs: row.get(2)?,
                total_events_found: row.get(3)?,
                total_events_added: row.get(4)?,
                last_run: row.get(5)?,
            })
        })?;
        let stats = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stats)
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let date: Option<String> = row.get(2)?;
    let latitude: Option<f64> = row.get(4)?;
    let longitude: Option<f64> = row.get(5)?;
    let event_type: String = row.get(7)?;
    Ok(Event {
        title: row.get(0)?,
        description: row.get(1)?,
        date: date.and_then(|d| NaiveDateTime::parse_from_str(&d, DATE_FORMAT).ok()),
        location: row.get(3)?,
        coordinates: latitude.zip(longitude).map(|(lat, lng)| Coordinates { lat, lng }),
        distance: row.get(6)?,
        event_type: EventType::from_label(&event_type),
        url: row.get(8)?,
        source: row.get(9)?,
        live: row.get(10)?,
    })
}
