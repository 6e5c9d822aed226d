//! Historical store adapter (read side).
//!
//! The gateway never writes readings here; the processing worker does. The
//! adapter only answers newest-first queries and reports diagnostics.
//!
//! Ordering is by the producer-supplied `timestamp` field, descending. Ties
//! keep whatever order the backend returns.

mod memory;
mod mongo;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{StoreDiagnostics, StoredReading};

pub use self::memory::MemoryStore;
pub use self::mongo::MongoStore;

#[async_trait]
pub trait ReadingStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Up to `limit` most recent readings across all sensors.
    ///
    /// An empty store yields an empty vector, not an error.
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<StoredReading>>;

    /// Up to `limit` most recent readings for one sensor.
    async fn list_by_sensor(&self, sensor_id: &str, limit: i64)
    -> AppResult<Vec<StoredReading>>;

    /// Connectivity, collection names and row count. Never fails; an
    /// unreachable store reports `connected: false`.
    async fn diagnostics(&self) -> StoreDiagnostics;

    async fn close(&self);
}
