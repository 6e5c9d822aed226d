//! Fuzz testing for reading validation.
//!
//! Feeds arbitrary bytes through the same path a request body takes: JSON
//! decoding, then `validate_reading`. Checks that validation
//!
//! - never panics on any decodable JSON value
//! - only accepts readings that re-encode for the queue
//! - reports every missing field at most once
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensor_gateway::validation::{ValidationError, validate_reading};

fuzz_target!(|data: &[u8]| {
    let Ok(candidate) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    match validate_reading(&candidate) {
        Ok(reading) => {
            let payload = reading.to_queue_payload().expect("accepted reading must encode");
            assert!(!payload.is_empty());
        }
        Err(ValidationError::MissingFields(fields)) => {
            let mut unique = fields.clone();
            unique.dedup();
            assert_eq!(unique.len(), fields.len());
            assert!(!fields.is_empty());
        }
        Err(ValidationError::InvalidType) => {}
    }
});
