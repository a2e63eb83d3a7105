//! Characteristic payload encoding.
//!
//! BLE reads and notifications carry a small UTF-8 JSON object:
//!
//! ```text
//! {"distance":17.2,"unit":"cm"}
//! ```
//!
//! Before the first valid measurement `distance` is `null`.

use serde::Serialize;
use tracing::debug;

use crate::data::{DistanceSample, ReadingSnapshot, SharedReading};
use crate::error::Result;

/// Unit string sent with every payload.
pub const DISTANCE_UNIT: &str = "cm";

#[derive(Debug, Serialize)]
struct DistancePayload {
    distance: Option<f64>,
    unit: &'static str,
}

/// Encode a sample as the characteristic value.
pub fn encode_sample(sample: &DistanceSample) -> Result<Vec<u8>> {
    let payload = DistancePayload {
        distance: sample.distance_cm(),
        unit: DISTANCE_UNIT,
    };
    Ok(serde_json::to_vec(&payload)?)
}

/// Read-side accessor for the BLE callbacks.
///
/// Only reads the shared cell, so it is safe to call from the BLE event
/// loop: no sensor I/O happens on this path.
#[derive(Debug, Clone)]
pub struct ReadingPublisher {
    reading: SharedReading,
}

impl ReadingPublisher {
    /// Create a publisher over the given reading.
    pub fn new(reading: SharedReading) -> Self {
        Self { reading }
    }

    /// Encoded value of the current reading.
    pub fn payload(&self) -> Result<Vec<u8>> {
        let sample = self.reading.current();
        debug!("Client read distance: {}", sample);
        encode_sample(&sample)
    }

    /// Current snapshot, for callers that track the sequence number.
    pub fn snapshot(&self) -> ReadingSnapshot {
        self.reading.snapshot()
    }

    /// Encoded value if a sample newer than `seen` exists.
    ///
    /// Returns the new sequence number together with the payload.
    pub fn payload_since(&self, seen: u64) -> Result<Option<(u64, Vec<u8>)>> {
        let snapshot = self.reading.snapshot();
        if snapshot.sequence <= seen {
            return Ok(None);
        }
        let payload = encode_sample(&snapshot.sample)?;
        Ok(Some((snapshot.sequence, payload)))
    }
}
