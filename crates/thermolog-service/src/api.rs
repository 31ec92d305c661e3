//! REST API endpoints for the thermolog-service.
//!
//! This module provides HTTP endpoints for ingesting readings and querying a
//! sensor's day history and current value.
//!
//! # Blocking Store Access
//!
//! Store calls are blocking filesystem operations. Handlers move them onto
//! the blocking thread pool with [`spawn_blocking`](tokio::task::spawn_blocking)
//! and never hold a lock across them; the store itself is lock-free.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]:
//!
//! | Store error kind | Status |
//! |------------------|--------|
//! | `not_found`, `empty_day` | 404 |
//! | `invalid_input` | 400 |
//! | `store_unavailable`, `malformed_record`, `invalid_temperature`, `invalid_timestamp` | 500 |
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use thermolog_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use thermolog_store::{ErrorKind, StoredReading, TimeSeriesStore};
use thermolog_types::{DayKey, Reading};

use crate::bulk::{self, CurrentValue, SensorCurrent};
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        // Bulk listing
        .route("/api/sensors/current", get(list_current))
        // Ingestion
        .route(
            "/api/sensors/{id}/temperature/{temperature}",
            post(ingest_reading),
        )
        // Retrieval
        .route("/api/sensors/{id}/current", get(get_current))
        .route("/api/sensors/{id}/days", get(list_days))
        .route("/api/sensors/{id}/days/{date}", get(get_day))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        started_at: state.started_at,
    })
}

/// Response to a successful ingestion.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// The reading as stamped by the server.
    #[serde(flatten)]
    pub reading: Reading,
    /// Day file the reading was appended to.
    pub day: DayKey,
}

/// Record a temperature for a sensor, stamped with the current instant.
async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    Path((id, temperature)): Path<(String, String)>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let temperature = parse_temperature(&temperature)?;
    let reading = Reading::now(id, temperature);

    let to_store = reading.clone();
    let day = with_store(&state, move |store| store.append(&to_store)).await?;

    debug!(
        "Ingested {} = {} for {}",
        reading.id, reading.temperature, day
    );

    Ok((StatusCode::CREATED, Json(IngestResponse { reading, day })))
}

/// All readings of a sensor on one day, in append order.
async fn get_day(
    State(state): State<Arc<AppState>>,
    Path((id, date)): Path<(String, String)>,
) -> Result<Json<Vec<StoredReading>>, AppError> {
    let day = DayKey::parse(&date).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let readings = with_store(&state, move |store| store.read_day(&id, &day)).await?;
    Ok(Json(readings))
}

/// Day keys with data for a sensor, oldest first.
async fn list_days(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DayKey>>, AppError> {
    let days = with_store(&state, move |store| store.list_days(&id)).await?;
    Ok(Json(days))
}

/// Current value of a sensor.
async fn get_current(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CurrentValue>, AppError> {
    let resolver = state.resolver();
    let value = tokio::task::spawn_blocking(move || bulk::resolve_current(&resolver, &id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(value))
}

/// Current value of every sensor in the store, with per-sensor status.
async fn list_current(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SensorCurrent>>, AppError> {
    let ids = with_store(&state, |store| store.list_entities()).await?;
    info!("Resolving current values for {} sensor(s)", ids.len());

    let results = bulk::resolve_latest(
        state.resolver(),
        ids,
        state.config.server.bulk_concurrency,
    )
    .await;

    Ok(Json(results))
}

/// Parse a temperature path segment as a finite number.
fn parse_temperature(raw: &str) -> Result<f64, AppError> {
    raw.parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid temperature: {}", raw)))
}

/// Run a blocking store operation on the blocking thread pool.
async fn with_store<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&TimeSeriesStore) -> thermolog_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(result?)
}

/// API error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Store(thermolog_store::Error),
    Internal(String),
}

impl From<thermolog_store::Error> for AppError {
    fn from(e: thermolog_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Store(e) => {
                let status = match e.kind() {
                    ErrorKind::NotFound | ErrorKind::EmptyDay => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind().as_str(), e.to_string())
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        let body = serde_json::json!({
            "error": message,
            "kind": kind,
        });

        (status, Json(body)).into_response()
    }
}
