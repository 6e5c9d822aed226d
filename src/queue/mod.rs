//! Durable queue adapter.
//!
//! Accepted readings are appended to the tail of a list in the shared
//! key-value store, where the processing worker picks them up.
//!
//! # Contract
//!
//! - `enqueue` is awaited by the request handler; the caller is acknowledged
//!   only after the append returned successfully.
//! - When the adapter is not ready, `enqueue` makes one recovery attempt
//!   first. If that fails it returns `AppError::ServiceUnavailable` without
//!   attempting the append.
//! - Appends from one connection keep their order. Concurrent producers may
//!   interleave.
//!
//! # Consistency With The Historical Store
//!
//! The queue and the document store are written independently (the latter by
//! the worker). A reading acknowledged here may not be visible in the store
//! yet, or ever if the worker fails. There is no compensating transaction.
//!
//! # Implementations
//!
//! - [`RedisQueue`] - `RPUSH` onto a Redis list via a multiplexed connection
//! - [`MemoryQueue`] - process-local list for tests and demos

mod memory;
mod redis;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::SensorReading;

pub use self::memory::MemoryQueue;
pub use self::redis::RedisQueue;

/// Acknowledgement of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueAck {
    /// Length of the list right after the append
    pub queue_length: u64,
}

/// A FIFO queue of serialized readings.
#[async_trait]
pub trait ReadingQueue: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Last known readiness. Does not touch the network.
    fn is_ready(&self) -> bool;

    /// Append a reading to the tail of the queue.
    async fn enqueue(&self, reading: &SensorReading) -> AppResult<QueueAck>;

    /// Live connectivity check; refreshes readiness.
    async fn ping(&self) -> AppResult<()>;

    /// Release the connection. Later calls report not-ready.
    async fn close(&self);
}
