//! In-memory historical store for tests and `STORAGE_BACKEND=memory`.

use std::cmp;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::ReadingStore;
use crate::error::{AppError, AppResult};
use crate::models::{SensorReading, StoreDiagnostics, StoredReading};

const COLLECTION_NAME: &str = "sensor_logs";

/// Process-local readings collection.
///
/// Stands in for the worker's writes through [`MemoryStore::insert`]. Every
/// query is counted so tests can assert the store was never reached.
pub struct MemoryStore {
    rows: RwLock<Vec<StoredReading>>,
    available: AtomicBool,
    next_id: AtomicU64,
    queries: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            queries: AtomicU64::new(0),
        }
    }

    /// Persist a reading the way the processing worker would.
    pub async fn insert(&self, reading: SensorReading) -> String {
        let id = format!("{:024x}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut stored = StoredReading::from(reading);
        stored.id = Some(id.clone());
        self.rows.write().await.push(stored);
        id
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of list queries served or refused so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    async fn select<F>(&self, limit: i64, filter: F) -> AppResult<Vec<StoredReading>>
    where
        F: Fn(&StoredReading) -> bool,
    {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable(
                "In-memory store unavailable".to_string(),
            ));
        }

        let mut matches: Vec<StoredReading> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| filter(row))
            .cloned()
            .collect();
        matches.sort_by(|a, b| compare_timestamps(&b.reading.timestamp, &a.reading.timestamp));
        matches.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(matches)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list_recent(&self, limit: i64) -> AppResult<Vec<StoredReading>> {
        self.select(limit, |_| true).await
    }

    async fn list_by_sensor(&self, sensor_id: &str, limit: i64) -> AppResult<Vec<StoredReading>> {
        self.select(limit, |row| row.reading.sensor_id.as_str() == Some(sensor_id))
            .await
    }

    async fn diagnostics(&self) -> StoreDiagnostics {
        if !self.available.load(Ordering::SeqCst) {
            return StoreDiagnostics::default();
        }
        StoreDiagnostics {
            connected: true,
            collections: vec![COLLECTION_NAME.to_string()],
            sensor_data_count: self.rows.read().await.len() as u64,
        }
    }

    async fn close(&self) {
        self.set_available(false);
    }
}

/// Ascending order over JSON timestamps, following MongoDB's cross-type sort:
/// null, numbers, strings, objects, arrays, booleans.
fn compare_timestamps(a: &Value, b: &Value) -> cmp::Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Object(_) => 3,
            Value::Array(_) => 4,
            Value::Bool(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
