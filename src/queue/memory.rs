//! In-memory reading queue for tests and `STORAGE_BACKEND=memory`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{QueueAck, ReadingQueue};
use crate::error::{AppError, AppResult};
use crate::models::SensorReading;

/// Process-local list of serialized readings.
///
/// Availability and append failures can be toggled to exercise the
/// gateway's error paths without a real Redis.
pub struct MemoryQueue {
    entries: Mutex<VecDeque<String>>,
    available: AtomicBool,
    failing_appends: AtomicBool,
    pings: AtomicU64,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            available: AtomicBool::new(true),
            failing_appends: AtomicBool::new(false),
            pings: AtomicU64::new(0),
        }
    }

    /// Simulate the store becoming (un)reachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make appends fail with a store error while the connection stays ready.
    pub fn set_failing_appends(&self, failing: bool) {
        self.failing_appends.store(failing, Ordering::SeqCst);
    }

    pub fn ping_count(&self) -> u64 {
        self.pings.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Queued payloads in append order, without removing them.
    pub async fn snapshot(&self) -> Vec<String> {
        self.entries.lock().await.iter().cloned().collect()
    }

    /// Remove and return every queued payload in append order.
    pub async fn drain(&self) -> Vec<String> {
        self.entries.lock().await.drain(..).collect()
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingQueue for MemoryQueue {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn is_ready(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn enqueue(&self, reading: &SensorReading) -> AppResult<QueueAck> {
        if !self.is_ready() {
            return Err(AppError::ServiceUnavailable(
                "In-memory queue unavailable".to_string(),
            ));
        }
        if self.failing_appends.load(Ordering::SeqCst) {
            return Err(AppError::QueueError("append rejected".to_string()));
        }

        let payload = reading.to_queue_payload()?;
        let mut entries = self.entries.lock().await;
        entries.push_back(payload);
        Ok(QueueAck {
            queue_length: entries.len() as u64,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.is_ready() {
            Ok(())
        } else {
            Err(AppError::ServiceUnavailable(
                "In-memory queue unavailable".to_string(),
            ))
        }
    }

    async fn close(&self) {
        self.set_available(false);
    }
}
