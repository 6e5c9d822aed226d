mod health;
mod readings;

pub use health::{diagnostic, health_check};
pub use readings::{ingest_reading, list_all_readings, list_sensor_readings};
