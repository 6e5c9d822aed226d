//! Router-level tests over the in-memory queue and store.
//!
//! Each test drives the full middleware stack with `tower::ServiceExt::oneshot`.
//! The processing worker is simulated by [`TestApp::persist_queued`], which
//! moves queued payloads into the store the way the worker would.
//!
//! Run with: `cargo test --test api_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use sensor_gateway::models::SensorReading;
use sensor_gateway::{AppState, Config, MemoryQueue, MemoryStore, build_router};

struct TestApp {
    router: Router,
    queue: Arc<MemoryQueue>,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let queue = Arc::new(MemoryQueue::new());
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(queue.clone(), store.clone(), config).unwrap();
        Self {
            router: build_router(state),
            queue,
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        (status, body)
    }

    async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        (status, body)
    }

    /// Move everything on the queue into the store, as the worker would.
    async fn persist_queued(&self) {
        for payload in self.queue.drain().await {
            let reading: SensorReading = serde_json::from_str(&payload).unwrap();
            self.store.insert(reading).await;
        }
    }
}

fn reading(sensor_id: &str, value: f64, timestamp: &str) -> Value {
    json!({
        "sensor_id": sensor_id,
        "sensor_type": "temperature",
        "location": "field_0",
        "value": value,
        "timestamp": timestamp
    })
}

// =============================================================================
// Ingestion
// =============================================================================

#[tokio::test]
async fn test_valid_reading_is_acknowledged_and_queued() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json(
            "/api/sensor-data",
            &reading("temperature_sensor_1", 23.5, "2024-01-15T10:30:00Z"),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "message": "Data received and queued for processing",
            "sensor_id": "temperature_sensor_1"
        })
    );
    assert_eq!(app.queue.len().await, 1);
}

#[tokio::test]
async fn test_legacy_ingest_path_is_equivalent() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/sensor-data", &reading("s1", 1.0, "2024-01-15T10:30:00Z"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.queue.len().await, 1);
}

#[tokio::test]
async fn test_extra_fields_are_queued_unchanged() {
    let app = TestApp::new();
    let mut submitted = reading("s1", 23.5, "2024-01-15T10:30:00Z");
    submitted["quality"] = json!("good");
    submitted["battery_level"] = json!(87);

    let (status, _) = app.post_json("/api/sensor-data", &submitted).await;

    assert_eq!(status, StatusCode::OK);
    let queued: Value = serde_json::from_str(&app.queue.snapshot().await[0]).unwrap();
    assert_eq!(queued, submitted);
}

#[tokio::test]
async fn test_non_numeric_value_is_rejected() {
    let app = TestApp::new();
    let mut submitted = reading("s1", 0.0, "2024-01-15T10:30:00Z");
    submitted["value"] = json!("23.5");

    let (status, body) = app.post_json("/api/sensor-data", &submitted).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Value must be a number"}));
    assert!(app.queue.is_empty().await);
}

#[tokio::test]
async fn test_numeric_sensor_id_and_timestamp_are_accepted() {
    let app = TestApp::new();
    let mut submitted = reading("s1", 23.5, "2024-01-15T10:30:00Z");
    submitted["sensor_id"] = json!(42);
    submitted["timestamp"] = json!(1_704_067_200);
    submitted["sensor_type"] = json!(7);

    let (status, body) = app.post_json("/api/sensor-data", &submitted).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sensor_id"], 42);
    let queued: Value = serde_json::from_str(&app.queue.snapshot().await[0]).unwrap();
    assert_eq!(queued, submitted);
}

#[tokio::test]
async fn test_missing_fields_are_listed() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/api/sensor-data", &json!({"sensor_id": "s1", "value": 3}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Missing required fields: sensor_type, location, timestamp"
    );
    assert!(app.queue.is_empty().await);
}

#[tokio::test]
async fn test_zero_value_counts_as_missing() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/api/sensor-data", &reading("s1", 0.0, "2024-01-15T10:30:00Z"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: value");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Request::post("/api/sensor-data")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"sensor_id\": \"s1\","))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed JSON in request body");
    assert!(app.queue.is_empty().await);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = TestApp::with_config(Config {
        max_request_body_size: 64,
        ..Config::default()
    });
    let mut submitted = reading("s1", 1.5, "2024-01-15T10:30:00Z");
    submitted["notes"] = json!("x".repeat(256));

    let (status, body) = app.post_json("/api/sensor-data", &submitted).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Request body too large");
    assert!(app.queue.is_empty().await);
}

#[tokio::test]
async fn test_unavailable_queue_returns_503_without_enqueuing() {
    let app = TestApp::new();
    app.queue.set_available(false);

    let (status, body) = app
        .post_json("/api/sensor-data", &reading("s1", 1.5, "2024-01-15T10:30:00Z"))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Service temporarily unavailable"}));
    assert!(app.queue.is_empty().await);
}

#[tokio::test]
async fn test_failed_append_returns_500_without_details() {
    let app = TestApp::new();
    app.queue.set_failing_appends(true);

    let (status, body) = app
        .post_json("/api/sensor-data", &reading("s1", 1.5, "2024-01-15T10:30:00Z"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
    assert!(app.queue.is_empty().await);
}

#[tokio::test]
async fn test_development_mode_exposes_error_details() {
    let app = TestApp::with_config(Config {
        development: true,
        ..Config::default()
    });
    app.queue.set_failing_appends(true);

    let (status, body) = app
        .post_json("/api/sensor-data", &reading("s1", 1.5, "2024-01-15T10:30:00Z"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(body["details"].as_str().unwrap().contains("append rejected"));
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_persisted_reading_is_visible_per_sensor() {
    let app = TestApp::new();
    app.post_json(
        "/api/sensor-data",
        &reading("s1", 23.5, "2024-01-15T10:30:00Z"),
    )
    .await;
    app.persist_queued().await;

    let (status, body) = app.get("/api/sensor-data/s1").await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["sensor_id"], "s1");
    assert_eq!(rows[0]["value"], 23.5);
    assert!(rows[0]["_id"].is_string());
}

#[tokio::test]
async fn test_queued_but_not_persisted_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app
        .post_json("/api/sensor-data", &reading("s1", 23.5, "2024-01-15T10:30:00Z"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/sensor-data/s1").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"error": "No data found for sensor", "sensor_id": "s1"})
    );
}

#[tokio::test]
async fn test_empty_store_lists_empty_array() {
    let app = TestApp::new();

    for uri in ["/api/sensor-data/all", "/sensor-data/all"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!([]), "{uri}");
    }
}

#[tokio::test]
async fn test_reserved_identifier_never_reaches_store() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/sensor-data/%61ll").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid sensor ID. Use /api/sensor-data/all for all sensors"
    );
    assert_eq!(app.store.query_count(), 0);
}

#[tokio::test]
async fn test_listing_is_newest_first_and_limited() {
    let app = TestApp::new();
    for second in [3, 1, 5, 2, 4] {
        app.post_json(
            "/api/sensor-data",
            &reading("s1", f64::from(second), &format!("2024-01-15T10:30:0{second}Z")),
        )
        .await;
    }
    app.persist_queued().await;

    let (status, body) = app.get("/api/sensor-data/all?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    let stamps: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    assert_eq!(
        stamps,
        vec![
            "2024-01-15T10:30:05Z",
            "2024-01-15T10:30:04Z",
            "2024-01-15T10:30:03Z"
        ]
    );

    let (_, body) = app.get("/api/sensor-data/s1?limit=abc").await;
    assert_eq!(body.as_array().unwrap().len(), 5);

    let (_, body) = app.get("/api/sensor-data/s1?limit=2").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_listing_is_capped_by_query_max_limit() {
    let app = TestApp::with_config(Config {
        query_max_limit: 2,
        ..Config::default()
    });
    for second in 1..=4 {
        app.post_json(
            "/api/sensor-data",
            &reading("s1", 1.5, &format!("2024-01-15T10:30:0{second}Z")),
        )
        .await;
    }
    app.persist_queued().await;

    let (_, body) = app.get("/api/sensor-data/all?limit=500").await;

    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unavailable_store_returns_503() {
    let app = TestApp::new();
    app.store.set_available(false);

    let (status, body) = app.get("/api/sensor-data/s1").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service temporarily unavailable");
}

// =============================================================================
// Health & diagnostics
// =============================================================================

#[tokio::test]
async fn test_health_reflects_queue_connectivity() {
    let app = TestApp::new();

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["redis"], "connected");
    assert!(body["timestamp"].is_string());

    app.queue.set_available(false);
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["redis"], "disconnected");
}

#[tokio::test]
async fn test_diagnostic_reports_store_state() {
    let app = TestApp::new();
    app.post_json("/api/sensor-data", &reading("s1", 1.5, "2024-01-15T10:30:00Z"))
        .await;
    app.persist_queued().await;

    let (status, body) = app.get("/api/diagnostic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"mongodb": {"connected": true, "collections": ["sensor_logs"], "sensorDataCount": 1}})
    );

    app.store.set_available(false);
    let (status, body) = app.get("/api/diagnostic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"mongodb": {"connected": false, "collections": [], "sensorDataCount": 0}})
    );
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_request_id_is_generated_and_echoed() {
    let app = TestApp::new();

    let (_, headers, _) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    let generated = headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    let (_, headers, _) = app
        .send(
            Request::get("/health")
                .header("x-request-id", "field-gw-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(headers.get("x-request-id").unwrap(), "field-gw-42");
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let app = TestApp::new();

    let (_, headers, _) = app
        .send(
            Request::get("/health")
                .header(header::ORIGIN, "http://dashboard.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_unknown_route_is_404_with_request_id() {
    let app = TestApp::new();

    let (status, headers, _) = app
        .send(Request::get("/api/unknown").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.contains_key("x-request-id"));
}
