//! Redis-backed reading queue.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{QueueAck, ReadingQueue};
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::SensorReading;

/// Queue adapter appending readings to a Redis list with `RPUSH`.
///
/// # Connection Handling
///
/// A [`ConnectionManager`] multiplexes all requests over one connection and
/// reconnects on its own after the connection drops. This adapter adds a
/// readiness flag on top:
///
/// - cleared when an append or ping fails with a connection-class error
/// - set again by the next successful recovery ping
///
/// An append that finds the flag cleared first tries to recover: it pings
/// through the existing manager, or opens the connection if Redis was
/// unreachable at startup. Concurrent callers share one attempt through
/// [`ConnectionState`], and the append is refused only when that attempt fails.
pub struct RedisQueue {
    client: redis::Client,
    connection: RwLock<Option<ConnectionManager>>,
    key: String,
    operation_timeout: Duration,
    state: ConnectionState,
}

impl RedisQueue {
    /// Build the adapter and try to connect once.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` only if the Redis URL is malformed.
    /// An unreachable server is logged and leaves the adapter not-ready.
    #[instrument(skip(config), fields(url = %config.redis_url(), key = %config.queue_key))]
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let client = redis::Client::open(config.redis_url())
            .map_err(|e| AppError::ConfigError(format!("Invalid Redis URL: {e}")))?;

        let queue = Self {
            client,
            connection: RwLock::new(None),
            key: config.queue_key.clone(),
            operation_timeout: config.operation_timeout,
            state: ConnectionState::new(),
        };

        match queue.recover().await {
            Ok(()) => info!("Connected to Redis queue store"),
            Err(e) => warn!(error = %e, "Redis unavailable at startup, continuing degraded"),
        }

        Ok(queue)
    }

    /// Restore readiness, or wait for a recovery already in flight.
    async fn recover(&self) -> AppResult<()> {
        if !self.state.start_reconnecting() {
            self.state.wait_for_reconnection().await;
            return if self.state.is_connected() {
                Ok(())
            } else {
                Err(AppError::ServiceUnavailable(
                    "Redis reconnect by another task failed".to_string(),
                ))
            };
        }

        let result = match self.current_connection().await {
            Some(mut conn) => self.checked_ping(&mut conn).await,
            None => self.open_connection().await,
        };

        self.state.stop_reconnecting();
        result
    }

    /// Create the connection manager and verify it with a ping.
    async fn open_connection(&self) -> AppResult<()> {
        match timeout(self.operation_timeout, self.client.get_connection_manager()).await {
            Ok(Ok(mut manager)) => {
                *self.connection.write().await = Some(manager.clone());
                self.checked_ping(&mut manager).await
            }
            Ok(Err(e)) => Err(self.classify(e)),
            Err(_) => {
                self.mark_failed();
                Err(AppError::ServiceUnavailable(format!(
                    "Redis connection timed out after {:?}",
                    self.operation_timeout
                )))
            }
        }
    }

    /// `PING` with a timeout; updates readiness either way.
    async fn checked_ping(&self, conn: &mut ConnectionManager) -> AppResult<()> {
        match timeout(self.operation_timeout, Self::ping_connection(conn)).await {
            Ok(Ok(())) => {
                self.mark_connected();
                Ok(())
            }
            Ok(Err(e)) => Err(self.classify(e)),
            Err(_) => {
                self.mark_failed();
                Err(AppError::ServiceUnavailable(format!(
                    "Redis PING timed out after {:?}",
                    self.operation_timeout
                )))
            }
        }
    }

    async fn ping_connection(conn: &mut ConnectionManager) -> redis::RedisResult<()> {
        let pong: String = redis::cmd("PING").query_async(conn).await?;
        debug!(reply = %pong, "Redis PING");
        Ok(())
    }

    async fn current_connection(&self) -> Option<ConnectionManager> {
        self.connection.read().await.clone()
    }

    fn mark_connected(&self) {
        if !self.state.is_connected() {
            info!("Redis queue store ready");
        }
        self.state.set_connected(true);
        metrics::set_queue_connected(true);
    }

    fn mark_failed(&self) {
        let failures = self.state.record_failure();
        metrics::set_queue_connected(false);
        warn!(failures, "Redis queue store not ready");
    }

    /// Map a Redis error, clearing readiness for connection-class failures.
    fn classify(&self, e: redis::RedisError) -> AppError {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
        {
            self.mark_failed();
            AppError::ServiceUnavailable(format!("Redis connection error: {e}"))
        } else {
            AppError::QueueError(e.to_string())
        }
    }
}

#[async_trait]
impl ReadingQueue for RedisQueue {
    fn backend(&self) -> &'static str {
        "redis"
    }

    fn is_ready(&self) -> bool {
        self.state.is_connected()
    }

    #[instrument(skip(self, reading), fields(sensor_id = %reading.sensor_label(), key = %self.key))]
    async fn enqueue(&self, reading: &SensorReading) -> AppResult<QueueAck> {
        if !self.state.is_connected() {
            self.recover().await?;
        }
        let Some(mut conn) = self.current_connection().await else {
            return Err(AppError::ServiceUnavailable(
                "Redis client not initialized".to_string(),
            ));
        };

        let payload = reading.to_queue_payload()?;
        let started = Instant::now();

        match timeout(
            self.operation_timeout,
            conn.rpush::<_, _, u64>(&self.key, payload),
        )
        .await
        {
            Ok(Ok(queue_length)) => {
                metrics::record_enqueue_duration(started.elapsed().as_secs_f64());
                debug!(queue_length, "Reading appended to queue");
                Ok(QueueAck { queue_length })
            }
            Ok(Err(e)) => Err(self.classify(e)),
            Err(_) => {
                self.mark_failed();
                Err(AppError::ServiceUnavailable(format!(
                    "Redis append timed out after {:?}",
                    self.operation_timeout
                )))
            }
        }
    }

    async fn ping(&self) -> AppResult<()> {
        match self.current_connection().await {
            Some(mut conn) if self.state.is_connected() => self.checked_ping(&mut conn).await,
            _ => self.recover().await,
        }
    }

    async fn close(&self) {
        let released = self.connection.write().await.take();
        self.state.set_connected(false);
        metrics::set_queue_connected(false);
        if released.is_some() {
            info!("Redis queue connection released");
        }
    }
}
