//! # Sensor Gateway
//!
//! HTTP ingestion gateway for agricultural IoT telemetry:
//!
//! - **Ingest**: validates sensor readings and appends them to a durable
//!   Redis list for the processing worker
//! - **Relay**: forwards accepted readings to a cloud endpoint, best effort
//! - **History**: serves recent readings from the MongoDB store the worker
//!   writes to
//! - **Health**: live queue-store health check and document-store diagnostics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS → Body Limit)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, readings)                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (IngestService, HistoryService) + CloudRelay      │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  ReadingQueue (Redis list)   │  ReadingStore (MongoDB)      │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sensor_gateway::{AppState, Config, MongoStore, RedisQueue, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sensor_gateway::AppError> {
//!     let config = Config::from_env()?;
//!     let queue = Arc::new(RedisQueue::connect(&config).await?);
//!     let store = Arc::new(MongoStore::connect(&config).await);
//!
//!     let state = AppState::new(queue, store, config)?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! Run without Redis or MongoDB:
//! ```bash
//! STORAGE_BACKEND=memory cargo run
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod relay;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::{Config, StorageBackend};
pub use error::{AppError, AppResult};
pub use queue::{MemoryQueue, ReadingQueue, RedisQueue};
pub use relay::CloudRelay;
pub use routes::build_router;
pub use state::AppState;
pub use store::{MemoryStore, MongoStore, ReadingStore};
pub use validation::validate_reading;
