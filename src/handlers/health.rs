//! Health and diagnostic endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Live queue-store ping; 200 when healthy, 503 when degraded
//! - `GET /api/diagnostic` - Document-store connectivity report, always 200
//!
//! The health check pings the queue store on every call instead of reporting
//! a cached flag, so a recovered store shows up as healthy immediately.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::{instrument, warn};

use crate::models::{DiagnosticResponse, HealthResponse, LinkStatus};
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "redis": "connected",
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, redis) = match state.queue.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", LinkStatus::Connected),
        Err(e) => {
            warn!(error = %e, "Health check: queue store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "degraded",
                LinkStatus::Disconnected,
            )
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            redis,
            timestamp: Utc::now(),
        }),
    )
}

/// Document-store diagnostics. Never fails.
#[instrument(skip(state))]
pub async fn diagnostic(State(state): State<AppState>) -> Json<DiagnosticResponse> {
    Json(DiagnosticResponse {
        mongodb: state.history.diagnostics().await,
    })
}
