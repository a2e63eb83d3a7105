//! Data structures for distance readings.
//!
//! This module contains the measurement value type and the concurrency-safe
//! cell that hands the latest measurement from the sampling thread to the
//! BLE callbacks.

pub mod reading;
pub mod sample;

pub use reading::{ReadingSnapshot, SharedReading};
pub use sample::{DistanceSample, MAX_DISTANCE_CM, MIN_DISTANCE_CM};
