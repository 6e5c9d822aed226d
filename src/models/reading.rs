use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A single telemetry reading submitted by a sensor.
///
/// The five named fields are required. Anything else the producer sends
/// (`quality`, `battery_level`, ...) is kept in `extra` so the queued copy is
/// identical to what was received.
///
/// `value` is stored as a [`serde_json::Number`] so integers stay integers and
/// floats keep their shortest round-trip representation. The other required
/// fields are opaque JSON: producers send names, numbers or descriptors
/// (`"location": {"field": "A", "row": 3}`) and the gateway forwards them as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: Value,
    pub sensor_type: Value,
    pub location: Value,
    pub value: Number,
    /// Producer-supplied point in time, never assigned or parsed by the gateway
    pub timestamp: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SensorReading {
    /// `sensor_id` for log fields and acknowledgements: strings unquoted,
    /// anything else in its JSON form.
    pub fn sensor_label(&self) -> String {
        match &self.sensor_id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        }
    }

    /// Numeric value as `f64`, if representable.
    pub fn value_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    /// Encode for the queue. The worker on the other side expects plain JSON.
    pub fn to_queue_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A reading read back from the historical store.
///
/// Besides the reading itself, stored documents carry their store identifier
/// and whatever the processing worker added (`processed_at`, `status`, ...),
/// which end up in `reading.extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub reading: SensorReading,
}

impl From<SensorReading> for StoredReading {
    fn from(reading: SensorReading) -> Self {
        Self { id: None, reading }
    }
}
