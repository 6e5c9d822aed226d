use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement returned once a reading is on the queue.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Always `true`; failures are reported as error responses instead
    pub success: bool,
    /// Human-readable status
    pub message: String,
    /// Echo of the accepted reading's sensor, exactly as submitted
    pub sensor_id: Value,
}

impl IngestResponse {
    pub fn queued(sensor_id: Value) -> Self {
        Self {
            success: true,
            message: "Data received and queued for processing".to_string(),
            sensor_id,
        }
    }
}

/// Queue-store connectivity as reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Connected,
    Disconnected,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the queue answers a ping, `degraded` otherwise
    pub status: String,
    /// Queue-store connectivity
    pub redis: LinkStatus,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Document-store section of the diagnostic report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreDiagnostics {
    /// Whether the store answered
    pub connected: bool,
    /// Collection names in the readings database
    pub collections: Vec<String>,
    /// Number of persisted readings
    #[serde(rename = "sensorDataCount")]
    pub sensor_data_count: u64,
}

/// Diagnostic response.
#[derive(Debug, Serialize)]
pub struct DiagnosticResponse {
    pub mongodb: StoreDiagnostics,
}

/// Query parameters accepted by the listing endpoints.
///
/// `limit` is kept as a raw string and parsed leniently, so `?limit=abc`
/// falls back to the endpoint default instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
}
