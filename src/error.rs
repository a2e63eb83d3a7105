//! Error types for the rangefinder-ble crate.
//!
//! Measurement failures have their own type in
//! [`crate::sensor::MeasurementError`]; they are always recovered inside the
//! sampling loop and never surface through [`Error`].

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the BlueZ peripheral stack.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),

    /// Error from the BLE central stack used by the visibility check.
    #[error("Bluetooth scan error: {0}")]
    Scan(#[from] btleplug::Error),

    /// The GPIO peripheral could not be opened or a pin could not be claimed.
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// No Bluetooth adapter is present or powered.
    #[error("No Bluetooth adapter available")]
    AdapterUnavailable,

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// The read payload could not be encoded.
    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An OS-level I/O error, e.g. failing to spawn the sampling thread.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
