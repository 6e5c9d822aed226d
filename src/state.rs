//! Shared application state for Axum handlers.
//!
//! The state owns the two backing-store adapters, the services built on top
//! of them and the gateway configuration. It is cloned per request; every
//! component is behind an `Arc`.
//!
//! # Structured Concurrency
//!
//! Background work (the queue heartbeat and in-flight cloud relays) runs on a
//! single `tokio_util::task::TaskTracker` with a `CancellationToken` for the
//! long-lived tasks. Call `shutdown()` after the server stopped accepting
//! requests.

use std::sync::Arc;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::queue::ReadingQueue;
use crate::relay::CloudRelay;
use crate::services::{HistoryService, IngestService};
use crate::store::ReadingStore;

/// Shared application state for Axum handlers.
///
/// # Lifecycle
///
/// ```rust,ignore
/// let state = AppState::new(queue, store, config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn ReadingQueue>,
    pub store: Arc<dyn ReadingStore>,
    pub ingest: IngestService,
    pub history: HistoryService,
    pub config: Arc<Config>,
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Wire services over the given adapters and start the queue heartbeat.
    ///
    /// # Errors
    ///
    /// Fails only if the cloud relay client cannot be built.
    pub fn new(
        queue: Arc<dyn ReadingQueue>,
        store: Arc<dyn ReadingStore>,
        config: Config,
    ) -> AppResult<Self> {
        let task_tracker = TaskTracker::new();
        let relay = CloudRelay::new(&config, task_tracker.clone())?;

        let ingest = IngestService::new(queue.clone(), relay);
        let history = HistoryService::new(
            store.clone(),
            config.recent_limit_default,
            config.sensor_limit_default,
            config.query_max_limit,
        );

        let state = Self {
            queue,
            store,
            ingest,
            history,
            config: Arc::new(config),
            task_tracker,
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_heartbeat_task();

        Ok(state)
    }

    /// Periodically ping the queue store.
    ///
    /// A successful ping restores readiness after an outage, and establishes
    /// the connection if the gateway started while the queue store was down.
    fn spawn_heartbeat_task(&self) {
        let queue = self.queue.clone();
        let interval_duration = self.config.health_check_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(interval_duration);
            ticker.tick().await; // Skip first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Queue heartbeat received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match cancel.run_until_cancelled(queue.ping()).await {
                            Some(Ok(())) => trace!(backend = queue.backend(), "Queue heartbeat OK"),
                            Some(Err(e)) => warn!(backend = queue.backend(), error = %e, "Queue heartbeat failed"),
                            None => debug!("Queue heartbeat ping abandoned on shutdown"),
                        }
                    }
                }
            }

            debug!("Queue heartbeat shutting down");
        });
    }

    /// Stop background work and release backing-store connections.
    ///
    /// 1. Cancels the heartbeat and closes the tracker to new tasks
    /// 2. Waits for in-flight relays, bounded by the relay timeout
    /// 3. Releases the queue connection
    /// 4. Starts the store client teardown without waiting for it
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();

        let drain_timeout = CloudRelay::drain_timeout(&self.config);
        if tokio::time::timeout(drain_timeout, self.task_tracker.wait())
            .await
            .is_err()
        {
            warn!(
                pending = self.task_tracker.len(),
                "Background tasks still running after {:?}, abandoning them", drain_timeout
            );
        } else {
            info!("All background tasks have completed");
        }

        self.queue.close().await;

        let store = self.store.clone();
        tokio::spawn(async move { store.close().await });
    }
}
