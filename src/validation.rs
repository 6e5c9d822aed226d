//! Validation of submitted sensor readings.
//!
//! Validation runs on the raw decoded JSON before anything touches the queue.
//! The rules, in order:
//!
//! 1. Every required field must be present and "truthy": a missing key, `null`,
//!    `false`, `0` and `""` all count as absent. Every absent field is reported,
//!    in [`REQUIRED_FIELDS`] order.
//! 2. `value` must be a JSON number.
//!
//! The other required fields are accepted in any truthy shape: an epoch-number
//! `timestamp` or a structured `location` is queued exactly as sent.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::SensorReading;

/// Required reading fields, in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 5] = ["sensor_id", "sensor_type", "location", "value", "timestamp"];

/// Reasons a submitted reading is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Value must be a number")]
    InvalidType,
}

/// Validate a candidate reading and convert it into a [`SensorReading`].
///
/// # Errors
///
/// - [`ValidationError::MissingFields`] listing every absent required field
/// - [`ValidationError::InvalidType`] when every field is present but `value`
///   is not numeric
pub fn validate_reading(candidate: &Value) -> Result<SensorReading, ValidationError> {
    let empty = Map::new();
    let fields = candidate.as_object().unwrap_or(&empty);

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| !fields.get(*name).is_some_and(is_present))
        .collect();

    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let value = match fields.get("value") {
        Some(Value::Number(n)) => n.clone(),
        _ => return Err(ValidationError::InvalidType),
    };

    let field = |name: &str| fields.get(name).cloned().unwrap_or_default();

    let extra = fields
        .iter()
        .filter(|(k, _)| !REQUIRED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(SensorReading {
        sensor_id: field("sensor_id"),
        sensor_type: field("sensor_type"),
        location: field("location"),
        value,
        timestamp: field("timestamp"),
        extra,
    })
}

/// Presence test: falsy JSON values count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
