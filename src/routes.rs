//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  Set Request ID  │ ← x-request-id (UUID v4) unless the client sent one
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← span per request, carrying the request id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Propagate Req ID │ ← echoes x-request-id on the response
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Error Details   │ ← development only: `details` on 5xx bodies
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Body Limit     │ ← 413 beyond MAX_REQUEST_BODY_SIZE
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/health`, `/api/diagnostic` - Health & diagnostics
//! - `/sensor-data`, `/api/sensor-data` - Ingestion (POST)
//! - `/sensor-data/all`, `/api/sensor-data/all`, `/api/sensor-data/{sensor_id}` - History (GET)

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Request};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::handlers;
use crate::middleware::expose_error_details;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;
    let cors = build_cors_layer(&config.cors_allowed_origins);

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/diagnostic", get(handlers::diagnostic))
        // Ingestion; the unprefixed path is kept for older field devices
        .route("/sensor-data", post(handlers::ingest_reading))
        .route("/api/sensor-data", post(handlers::ingest_reading))
        // History
        .route("/sensor-data/all", get(handlers::list_all_readings))
        .route("/api/sensor-data/all", get(handlers::list_all_readings))
        .route(
            "/api/sensor-data/{sensor_id}",
            get(handlers::list_sensor_readings),
        );

    info!(
        max_size_kb = config.max_request_body_size / 1024,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    router = router.layer(cors);

    if config.development {
        info!("Development mode: error details exposed on 5xx responses");
        router = router.layer(axum::middleware::from_fn(expose_error_details));
    }

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    router = router
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    router.with_state(state)
}

/// Build CORS layer from configuration.
///
/// `["*"]` allows any origin; otherwise only the listed origins.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
