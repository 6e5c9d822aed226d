use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{AppError, AppResult};
use crate::models::{StoreDiagnostics, StoredReading};
use crate::store::ReadingStore;

/// Reserved identifier that names the unscoped listing, never a sensor.
const ALL_SENSORS: &str = "all";

/// Read-side queries over the historical store.
///
/// The two listings deliberately differ on empty results: the unscoped
/// listing returns an empty array, a per-sensor listing with no rows is
/// `NotFound`.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn ReadingStore>,
    recent_limit_default: i64,
    sensor_limit_default: i64,
    max_limit: i64,
}

impl HistoryService {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        recent_limit_default: i64,
        sensor_limit_default: i64,
        max_limit: i64,
    ) -> Self {
        Self {
            store,
            recent_limit_default,
            sensor_limit_default,
            max_limit,
        }
    }

    /// Most recent readings across every sensor.
    #[instrument(skip(self))]
    pub async fn recent(&self, raw_limit: Option<&str>) -> AppResult<Vec<StoredReading>> {
        let limit = resolve_limit(raw_limit, self.recent_limit_default, self.max_limit);
        let readings = self.store.list_recent(limit).await?;
        debug!(limit, count = readings.len(), "Recent readings listed");
        Ok(readings)
    }

    /// Most recent readings for one sensor.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidArgument` for the reserved identifier `all`; the
    ///   store is not queried
    /// - `AppError::NotFound` when the sensor has no stored readings
    #[instrument(skip(self))]
    pub async fn for_sensor(
        &self,
        sensor_id: &str,
        raw_limit: Option<&str>,
    ) -> AppResult<Vec<StoredReading>> {
        if sensor_id == ALL_SENSORS {
            return Err(AppError::InvalidArgument(
                "Invalid sensor ID. Use /api/sensor-data/all for all sensors".to_string(),
            ));
        }

        let limit = resolve_limit(raw_limit, self.sensor_limit_default, self.max_limit);
        let readings = self.store.list_by_sensor(sensor_id, limit).await?;
        if readings.is_empty() {
            return Err(AppError::NotFound {
                sensor_id: sensor_id.to_string(),
            });
        }
        Ok(readings)
    }

    pub async fn diagnostics(&self) -> StoreDiagnostics {
        self.store.diagnostics().await
    }
}

/// Turn a raw `limit` query value into a usable row count.
///
/// Parsing is lenient: optional surrounding whitespace, an optional sign, then
/// leading decimal digits (`"25abc"` is 25). Anything that yields no positive
/// number falls back to `default`; the result is capped at `max`.
pub fn resolve_limit(raw: Option<&str>, default: i64, max: i64) -> i64 {
    let parsed = raw.and_then(leading_integer).filter(|n| *n > 0);
    parsed.unwrap_or(default).min(max)
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let digits: String = unsigned.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    // Overlong digit runs saturate instead of failing.
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
