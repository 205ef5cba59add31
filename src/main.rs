use anyhow::Context;
use brooklyn_events::app::ports::{ClockPort, HttpClientPort};
use brooklyn_events::cache::EventCache;
use brooklyn_events::config::Config;
use brooklyn_events::infra::{clock::SystemClock, http_client::ReqwestHttp};
use brooklyn_events::pipeline::normalize::Normalizer;
use brooklyn_events::pipeline::Aggregator;
use brooklyn_events::server::{start_server, AppState};
use brooklyn_events::store::{EventStore, RunStatus, UpcomingFilter};
use brooklyn_events::types::EventType;
use brooklyn_events::{logging, metrics};
use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_DB_PATH: &str = "events.db";

#[derive(Parser)]
#[command(name = "brooklyn_events")]
#[command(about = "Brooklyn art, music and family event aggregator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API and the browser client
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Aggregate every source once, refresh the cache file and persist to SQLite
    Scrape {
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Delete stored events older than the given number of days
    Prune {
        #[arg(long, default_value_t = 30)]
        days: i64,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List stored upcoming events, soonest first
    Upcoming {
        /// Only events within this many days from now
        #[arg(long, default_value_t = 7)]
        days: i64,
        /// Restrict to one type: art, music, kids or other
        #[arg(long = "type")]
        event_type: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print scraping run statistics per source
    Stats {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

struct Runtime {
    config: Config,
    aggregator: Arc<Aggregator>,
    cache: Arc<EventCache>,
    clock: Arc<dyn ClockPort>,
}

fn build_runtime(config: Config) -> anyhow::Result<Runtime> {
    let http: Arc<dyn HttpClientPort> =
        Arc::new(ReqwestHttp::new(&config.http).context("failed to build HTTP client")?);
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
    let aggregator = Arc::new(Aggregator::from_config(&config, http, clock.clone()));
    info!("Registered sources: {:?}", aggregator.source_names());
    let cache = Arc::new(EventCache::new(
        aggregator.clone(),
        clock.clone(),
        config.cache.ttl(),
        config.cache.path.clone(),
    ));
    Ok(Runtime {
        config,
        aggregator,
        cache,
        clock,
    })
}

fn open_store(config: &Config, db: Option<PathBuf>) -> anyhow::Result<EventStore> {
    let path = db
        .or_else(|| config.store.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
    let store = EventStore::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?
        .with_normalizer(Normalizer::new(config.normalization.clone()));
    Ok(store)
}

async fn serve(runtime: Runtime, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(runtime.config.server.port);
    let store = match &runtime.config.store.path {
        Some(path) => Some(Arc::new(open_store(&runtime.config, Some(path.clone()))?)),
        None => None,
    };
    let state = AppState {
        cache: runtime.cache,
        store,
        clock: runtime.clock,
    };
    start_server(state, port, &runtime.config.server.static_dir)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))
}

async fn scrape(runtime: Runtime, db: Option<PathBuf>) -> anyhow::Result<()> {
    let store = open_store(&runtime.config, db)?;

    println!("🔄 Aggregating {} sources...", runtime.aggregator.source_names().len());
    let result = runtime.aggregator.aggregate().await;
    runtime.cache.replace(result.events.clone()).await;

    let written = store.upsert_events(&result.events)?;

    println!("\n📊 Scrape Results:");
    for report in &result.sources {
        let kept = result
            .events
            .iter()
            .filter(|e| e.source == report.source)
            .count();
        let status = RunStatus::from_report(report);
        if let Err(e) = store.log_scraping_run(
            &report.source,
            status,
            report.found,
            kept,
            report.error.as_deref(),
        ) {
            warn!("Failed to log run for {}: {}", report.source, e);
        }
        let icon = match status {
            RunStatus::Success => "✅",
            RunStatus::Fallback => "⚠️",
            RunStatus::Failed => "❌",
        };
        println!(
            "   {} {}: {} found, {} kept{}",
            icon,
            report.source,
            report.found,
            kept,
            report
                .error
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
    }
    println!("   Total events: {}", result.events.len());
    println!("   Duplicates merged: {}", result.duplicates);
    println!("   Rows written: {}", written);
    Ok(())
}

fn prune(config: &Config, days: i64, db: Option<PathBuf>) -> anyhow::Result<()> {
    let store = open_store(config, db)?;
    let deleted = store.delete_old_events(days, Local::now().naive_local())?;
    println!("🧹 Deleted {} events older than {} days", deleted, days);
    Ok(())
}

fn upcoming(
    config: &Config,
    days: i64,
    event_type: Option<String>,
    limit: usize,
    db: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = open_store(config, db)?;
    let now = Local::now().naive_local();
    let filter = UpcomingFilter {
        min_date: Some(now),
        max_date: Some(now + Duration::days(days)),
        event_type: event_type.as_deref().map(EventType::from_label),
        limit: Some(limit),
    };
    let events = store.upcoming_events(&filter, now)?;
    if events.is_empty() {
        println!("No stored events in the next {} days", days);
        return Ok(());
    }
    println!("📅 Next {} days:", days);
    for event in events {
        println!(
            "   {} [{}] {} @ {}{}",
            event
                .date
                .map(|d| d.format("%a %b %-d %H:%M").to_string())
                .unwrap_or_default(),
            event.event_type,
            event.title,
            event.location,
            event
                .distance
                .map(|d| format!(" ({:.1} mi)", d))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn stats(config: &Config, db: Option<PathBuf>) -> anyhow::Result<()> {
    let store = open_store(config, db)?;
    let stats = store.scraping_stats()?;
    if stats.is_empty() {
        println!("No scraping runs recorded yet");
        return Ok(());
    }
    println!("📈 Scraping statistics:");
    for s in stats {
        println!(
            "   {}: {}/{} successful runs, {} found, {} added, last run {}",
            s.source,
            s.successful_runs,
            s.total_runs,
            s.total_events_found,
            s.total_events_added,
            s.last_run.as_deref().unwrap_or("never")
        );
    }
    Ok(())
}

fn ensure_static_dir(dir: &Path) {
    if !dir.join("index.html").exists() {
        warn!("No index.html under {}; only the API will be served", dir.display());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { port } => {
            ensure_static_dir(&config.server.static_dir);
            serve(build_runtime(config)?, port).await
        }
        Commands::Scrape { db } => scrape(build_runtime(config)?, db).await,
        Commands::Prune { days, db } => prune(&config, days, db),
        Commands::Upcoming {
            days,
            event_type,
            limit,
            db,
        } => upcoming(&config, days, event_type, limit, db),
        Commands::Stats { db } => stats(&config, db),
    }
}
