use crate::app::ports::ClockPort;
use crate::cache::EventCache;
use crate::error::ScraperError;
use crate::presentation::{build_view, EventView, ViewQuery};
use crate::store::{EventStore, SourceStats};
use crate::types::Event;
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Local, Utc};
use hyper::Server;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<EventCache>,
    pub store: Option<Arc<EventStore>>,
    pub clock: Arc<dyn ClockPort>,
}

#[derive(Serialize)]
struct EventsResponse<'a> {
    events: &'a [Event],
    #[serde(skip_serializing_if = "Option::is_none")]
    fetched_at: Option<DateTime<Utc>>,
}

/// Every failure maps to the same opaque 500; details only go to the log.
struct ApiError(ScraperError);

impl From<ScraperError> for ApiError {
    fn from(e: ScraperError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "unable to load events" })),
        )
            .into_response()
    }
}

/// Health check endpoint; reports the cached entry without triggering a refresh
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.cache.peek().await.map(|entry| {
        serde_json::json!({
            "events": entry.events.len(),
            "fetched_at": entry.fetched_at,
        })
    });
    Json(serde_json::json!({
        "status": "healthy",
        "service": "brooklyn-events",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": cache,
    }))
}

async fn metrics_text() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render(),
    )
}

async fn get_events(State(state): State<AppState>) -> Result<Response, ApiError> {
    let entry = state.cache.get_or_refresh().await?;
    Ok(Json(EventsResponse {
        events: &entry.events,
        fetched_at: None,
    })
    .into_response())
}

async fn refresh_events(State(state): State<AppState>) -> Result<Response, ApiError> {
    let entry = state.cache.refresh().await?;
    Ok(Json(EventsResponse {
        events: &entry.events,
        fetched_at: Some(entry.fetched_at),
    })
    .into_response())
}

async fn view_events(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<EventView>, ApiError> {
    let entry = state.cache.get_or_refresh().await?;
    let now = state.clock.now().with_timezone(&Local).naive_local();
    Ok(Json(build_view(&entry.events, &query, now)))
}

async fn scraping_stats(State(state): State<AppState>) -> Result<Json<Vec<SourceStats>>, ApiError> {
    let store = match state.store {
        Some(store) => store,
        None => return Ok(Json(Vec::new())),
    };
    // rusqlite blocks; keep it off the async workers
    let stats = tokio::task::spawn_blocking(move || store.scraping_stats())
        .await
        .map_err(|e| ScraperError::Task(e.to_string()))??;
    Ok(Json(stats))
}

/// Create the HTTP router: JSON API, metrics and the static client
pub fn create_server(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/api/events", get(get_events))
        .route("/api/refresh", get(refresh_events).post(refresh_events))
        .route("/api/view", get(view_events))
        .route("/api/stats", get(scraping_stats))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    state: AppState,
    port: u16,
    static_dir: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(state, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("📅 Events API:   http://localhost:{port}/api/events");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
