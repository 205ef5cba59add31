use crate::app::ports::ClockPort;
use crate::error::{Result, ScraperError};
use crate::metrics::CacheMetrics;
use crate::pipeline::Aggregator;
use crate::types::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Snapshot of one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub events: Vec<Event>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Servable without refetch iff 0 <= age < ttl
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age < ttl,
            // fetched_at in the future: don't trust it
            Err(_) => false,
        }
    }
}

/// Single-entry event cache with time-based invalidation and optional file backing.
pub struct EventCache {
    aggregator: Arc<Aggregator>,
    clock: Arc<dyn ClockPort>,
    ttl: Duration,
    path: Option<PathBuf>,
    // Held across a refresh so concurrent callers share one aggregation
    entry: Mutex<Option<Arc<CacheEntry>>>,
}

impl EventCache {
    pub fn new(
        aggregator: Arc<Aggregator>,
        clock: Arc<dyn ClockPort>,
        ttl: Duration,
        path: Option<PathBuf>,
    ) -> Self {
        let entry = path.as_deref().and_then(load_entry).map(Arc::new);
        Self {
            aggregator,
            clock,
            ttl,
            path,
            entry: Mutex::new(entry),
        }
    }

    /// Current entry if still fresh, otherwise aggregate and replace it.
    pub async fn get_or_refresh(&self) -> Result<Arc<CacheEntry>> {
        let mut guard = self.entry.lock().await;
        if let Some(entry) = guard.as_ref() {
            if entry.is_fresh(self.clock.now(), self.ttl) {
                debug!("Serving {} cached events", entry.events.len());
                CacheMetrics::hit();
                return Ok(entry.clone());
            }
        }
        CacheMetrics::miss();
        self.refresh_locked(&mut guard).await
    }

    /// Invalidate and re-aggregate regardless of age.
    pub async fn refresh(&self) -> Result<Arc<CacheEntry>> {
        let mut guard = self.entry.lock().await;
        info!("Forced cache refresh");
        self.refresh_locked(&mut guard).await
    }

    /// Store an externally produced event list as the current entry.
    pub async fn replace(&self, events: Vec<Event>) -> Arc<CacheEntry> {
        let mut guard = self.entry.lock().await;
        self.store_locked(&mut guard, events).await
    }

    /// Current entry without triggering a refresh
    pub async fn peek(&self) -> Option<Arc<CacheEntry>> {
        self.entry.lock().await.clone()
    }

    async fn refresh_locked(
        &self,
        slot: &mut Option<Arc<CacheEntry>>,
    ) -> Result<Arc<CacheEntry>> {
        let aggregator = self.aggregator.clone();
        let started = Instant::now();
        // A panicking source must not take the server down or clobber the old entry
        let result = tokio::spawn(async move { aggregator.aggregate().await })
            .await
            .map_err(|e| {
                error!("Aggregation task failed: {}", e);
                ScraperError::Aggregation(e.to_string())
            })?;
        CacheMetrics::aggregation_duration(started.elapsed().as_secs_f64());
        Ok(self.store_locked(slot, result.events).await)
    }

    async fn store_locked(
        &self,
        slot: &mut Option<Arc<CacheEntry>>,
        events: Vec<Event>,
    ) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            events,
            fetched_at: self.clock.now(),
        });
        if let Some(path) = &self.path {
            if let Err(e) = persist_entry(path, &entry).await {
                warn!("Failed to write cache file {}: {}", path.display(), e);
            }
        }
        *slot = Some(entry.clone());
        entry
    }
}

fn load_entry(path: &Path) -> Option<CacheEntry> {
    if !path.exists() {
        return None;
    }
    let loaded = std::fs::read_to_string(path)
        .map_err(ScraperError::from)
        .and_then(|content| serde_json::from_str::<CacheEntry>(&content).map_err(ScraperError::from));
    match loaded {
        Ok(entry) => {
            info!(
                "Loaded {} cached events from {} (fetched {})",
                entry.events.len(),
                path.display(),
                entry.fetched_at
            );
            Some(entry)
        }
        Err(e) => {
            warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
            None
        }
    }
}

/// Write to a sibling temp file and rename over the target.
async fn persist_entry(path: &Path, entry: &CacheEntry) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(entry)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Wrote {} events to {}", entry.events.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(fetched_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            events: Vec::new(),
            fetched_at,
        }
    }

    #[test]
    fn freshness_boundaries() {
        let fetched = Utc::now();
        let ttl = Duration::from_secs(3600);
        let entry = entry_at(fetched);
        assert!(entry.is_fresh(fetched, ttl));
        assert!(entry.is_fresh(fetched + chrono::Duration::minutes(59), ttl));
        assert!(!entry.is_fresh(fetched + chrono::Duration::hours(1), ttl));
        assert!(!entry.is_fresh(fetched - chrono::Duration::minutes(1), ttl));
    }

    #[test]
    fn corrupt_cache_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events_cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_entry(&path).is_none());
        assert!(load_entry(&dir.path().join("missing.json")).is_none());
    }

    #[tokio::test]
    async fn persisted_entry_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("events_cache.json");
        let entry = entry_at(Utc::now());
        persist_entry(&path, &entry).await.unwrap();
        assert_eq!(load_entry(&path), Some(entry));
        assert!(!dir.path().join("nested").join("events_cache.json.tmp").exists());
    }
}
