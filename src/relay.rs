//! Best-effort forwarding of accepted readings to the cloud ingest endpoint.
//!
//! [`CloudRelay`] POSTs each accepted reading to `{endpoint}/api/ingest` with
//! a bearer token. Delivery runs on the gateway's [`TaskTracker`], detached
//! from the request that produced it: the client has already been answered,
//! and a failed delivery is logged and dropped. No retries.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::SensorReading;

const INGEST_PATH: &str = "/api/ingest";

/// Error type for relay delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Network, DNS, TLS or timeout failure.
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The cloud endpoint answered with a non-2xx status.
    #[error("relay endpoint returned HTTP {0}")]
    HttpStatus(u16),
}

struct RelayTarget {
    client: reqwest::Client,
    url: String,
    secret: String,
}

impl RelayTarget {
    async fn forward(&self, reading: &SensorReading) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.secret)
            .json(reading)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RelayError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Fire-and-forget forwarder. Disabled when no endpoint or secret is configured.
#[derive(Clone)]
pub struct CloudRelay {
    target: Option<Arc<RelayTarget>>,
    tracker: TaskTracker,
}

impl CloudRelay {
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the HTTP client cannot be built.
    pub fn new(config: &Config, tracker: TaskTracker) -> AppResult<Self> {
        let Some(cloud) = config.cloud_relay.as_ref() else {
            info!("Cloud relay disabled (CLOUD_ENDPOINT or OCI_VAULT_SECRET not set)");
            return Ok(Self {
                target: None,
                tracker,
            });
        };

        let client = reqwest::Client::builder()
            .timeout(config.cloud_relay_timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build relay client: {e}")))?;

        let url = format!("{}{INGEST_PATH}", cloud.endpoint);
        info!(url = %url, timeout = ?config.cloud_relay_timeout, "Cloud relay enabled");

        Ok(Self {
            target: Some(Arc::new(RelayTarget {
                client,
                url,
                secret: cloud.secret.clone(),
            })),
            tracker,
        })
    }

    /// A relay that never forwards anything.
    pub fn disabled(tracker: TaskTracker) -> Self {
        Self {
            target: None,
            tracker,
        }
    }

    /// Schedule delivery of `reading` and return immediately.
    pub fn relay(&self, reading: SensorReading) {
        let Some(target) = self.target.clone() else {
            return;
        };

        self.tracker.spawn(async move {
            match target.forward(&reading).await {
                Ok(()) => {
                    metrics::record_relay("delivered");
                    info!(sensor_id = %reading.sensor_label(), "Reading relayed to cloud");
                }
                Err(e) => {
                    metrics::record_relay("failed");
                    warn!(sensor_id = %reading.sensor_label(), error = %e, "Cloud relay failed");
                }
            }
        });
    }

    /// Upper bound for draining in-flight deliveries at shutdown.
    pub fn drain_timeout(config: &Config) -> Duration {
        config.cloud_relay_timeout + Duration::from_secs(1)
    }
}
