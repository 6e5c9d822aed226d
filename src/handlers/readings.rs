//! Sensor reading ingestion and history handlers.
//!
//! # Endpoints
//!
//! - `POST /sensor-data`, `POST /api/sensor-data` - Accept one reading
//! - `GET /sensor-data/all`, `GET /api/sensor-data/all` - Recent readings
//! - `GET /api/sensor-data/{sensor_id}` - Recent readings for one sensor
//!
//! # Configurable Limits
//!
//! - `QUERY_MAX_LIMIT` - Upper bound for `?limit=` (default: 1000)
//! - `MAX_REQUEST_BODY_SIZE` - Request body cap (default: 100 KiB)

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use serde_json::Value;
use tracing::instrument;

use crate::error::AppResult;
use crate::models::{IngestResponse, ListQuery, StoredReading};
use crate::state::AppState;

/// Accept a reading and queue it for processing.
///
/// The body is taken as free-form JSON so that missing and mistyped fields
/// are reported by reading validation rather than by the extractor.
///
/// # Request Body
///
/// ```json
/// {
///   "sensor_id": "temperature_sensor_1",
///   "sensor_type": "temperature",
///   "location": "field_0",
///   "value": 23.5,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state, payload))]
pub async fn ingest_reading(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<IngestResponse>> {
    let Json(body) = payload?;
    let response = state.ingest.ingest(&body).await?;
    Ok(Json(response))
}

/// Most recent readings across all sensors, newest first.
#[instrument(skip(state))]
pub async fn list_all_readings(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<StoredReading>>> {
    let readings = state.history.recent(query.limit.as_deref()).await?;
    Ok(Json(readings))
}

/// Most recent readings for one sensor, newest first.
#[instrument(skip(state))]
pub async fn list_sensor_readings(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<StoredReading>>> {
    let readings = state
        .history
        .for_sensor(&sensor_id, query.limit.as_deref())
        .await?;
    Ok(Json(readings))
}
