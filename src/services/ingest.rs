use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::IngestResponse;
use crate::queue::ReadingQueue;
use crate::relay::CloudRelay;
use crate::validation::validate_reading;

/// Accepts readings: validate, enqueue, then hand off to the cloud relay.
///
/// A reading is acknowledged only after the queue confirmed the append. The
/// relay is started after that and never influences the outcome.
#[derive(Clone)]
pub struct IngestService {
    queue: Arc<dyn ReadingQueue>,
    relay: CloudRelay,
}

impl IngestService {
    pub fn new(queue: Arc<dyn ReadingQueue>, relay: CloudRelay) -> Self {
        Self { queue, relay }
    }

    /// Validate and queue one submitted reading.
    ///
    /// # Errors
    ///
    /// - `AppError::Validation` for a malformed reading (nothing queued)
    /// - `AppError::ServiceUnavailable` when the queue is not ready
    /// - `AppError::QueueError` when the append itself failed
    #[instrument(skip(self, body))]
    pub async fn ingest(&self, body: &Value) -> AppResult<IngestResponse> {
        let reading = validate_reading(body).map_err(|e| {
            metrics::record_reading_rejected("validation");
            debug!(error = %e, "Reading rejected");
            AppError::from(e)
        })?;

        let ack = self.queue.enqueue(&reading).await.map_err(|e| {
            let reason = match &e {
                AppError::ServiceUnavailable(_) => "unavailable",
                _ => "queue_error",
            };
            metrics::record_reading_rejected(reason);
            e
        })?;

        metrics::record_reading_accepted();
        info!(
            sensor_id = %reading.sensor_label(),
            queue_length = ack.queue_length,
            "Reading queued"
        );

        let response = IngestResponse::queued(reading.sensor_id.clone());
        self.relay.relay(reading);
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;
    use crate::validation::ValidationError;
    use serde_json::json;
    use tokio_util::task::TaskTracker;

    fn service(queue: Arc<MemoryQueue>) -> IngestService {
        IngestService::new(queue, CloudRelay::disabled(TaskTracker::new()))
    }

    fn body(sensor_id: &str) -> Value {
        json!({
            "sensor_id": sensor_id,
            "sensor_type": "temperature",
            "location": "field_0",
            "value": 23.5,
            "timestamp": "2024-01-01T00:00:00Z",
            "battery_level": 80
        })
    }

    #[tokio::test]
    async fn test_accepted_reading_is_queued_verbatim() {
        let queue = Arc::new(MemoryQueue::new());
        let service = service(queue.clone());

        let response = service.ingest(&body("s1")).await.unwrap();

        assert!(response.success);
        assert_eq!(response.sensor_id, "s1");

        let queued: Value = serde_json::from_str(&queue.snapshot().await[0]).unwrap();
        assert_eq!(queued, body("s1"));
    }

    #[tokio::test]
    async fn test_numeric_identity_fields_are_echoed() {
        let queue = Arc::new(MemoryQueue::new());
        let service = service(queue.clone());
        let mut payload = body("s1");
        payload["sensor_id"] = json!(42);
        payload["timestamp"] = json!(1_704_067_200);

        let response = service.ingest(&payload).await.unwrap();

        assert_eq!(response.sensor_id, json!(42));
        let queued: Value = serde_json::from_str(&queue.snapshot().await[0]).unwrap();
        assert_eq!(queued["timestamp"], 1_704_067_200);
    }

    #[tokio::test]
    async fn test_invalid_reading_never_reaches_queue() {
        let queue = Arc::new(MemoryQueue::new());
        let service = service(queue.clone());

        let err = service
            .ingest(&json!({"sensor_id": "s1", "value": "hot"}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::MissingFields(_))
        ));
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_queue_is_not_acknowledged() {
        let queue = Arc::new(MemoryQueue::new());
        queue.set_available(false);
        let service = service(queue.clone());

        let err = service.ingest(&body("s1")).await.unwrap_err();

        assert!(matches!(err, AppError::ServiceUnavailable(_)));
        assert!(queue.is_empty().await);
    }
}
