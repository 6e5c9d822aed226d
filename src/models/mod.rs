mod api;
mod reading;

pub use api::{
    DiagnosticResponse, HealthResponse, IngestResponse, LinkStatus, ListQuery, StoreDiagnostics,
};
pub use reading::{SensorReading, StoredReading};
