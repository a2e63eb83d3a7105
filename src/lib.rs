//! # rangefinder-ble
//!
//! Obstacle distance from an HC-SR04 ultrasonic sensor on a Raspberry Pi,
//! served to nearby devices (a smartwatch, a phone) as a Bluetooth Low Energy
//! GATT characteristic.
//!
//! ## Architecture
//!
//! - A [`SamplingLoop`] on its own thread triggers the sensor every 500 ms,
//!   times the echo with a bounded busy-wait ([`PulseTimer`]) and publishes
//!   valid readings into a [`SharedReading`].
//! - The BLE read and notify callbacks use a [`ReadingPublisher`] to encode
//!   the latest value as `{"distance": <cm>, "unit": "cm"}`. They never touch
//!   the sensor.
//!
//! Failed measurements (no echo, reading outside 2-400 cm, line faults) are
//! dropped; clients keep receiving the last good value.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rangefinder_ble::shutdown::{run_blocking, stop_sampling};
//! use rangefinder_ble::{
//!     Config, DistanceSampler, GattServer, ReadingPublisher, Result, RpiLines, SamplingLoop,
//!     SharedReading, ShutdownSignals,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let mut shutdown = ShutdownSignals::install()?;
//!     let reading = SharedReading::new();
//!
//!     let sensor = config.sensor.clone();
//!     let lines = run_blocking(move || RpiLines::from_config(&sensor)).await?;
//!     let sampler = DistanceSampler::new(lines, (&config.sensor).into());
//!     let sampling =
//!         SamplingLoop::new(sampler, reading.clone(), config.sensor.sample_interval).spawn()?;
//!
//!     let server = GattServer::start(&config.ble, ReadingPublisher::new(reading)).await?;
//!     shutdown.recv().await;
//!
//!     server.shutdown();
//!     stop_sampling(sampling).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! Linux only. Requires BlueZ (`bluetoothd`) and access to `/dev/gpiomem`;
//! the user may need to be in the `bluetooth` and `gpio` groups.

pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod publisher;
pub mod sampling;
pub mod sensor;
pub mod shutdown;

// Re-exports for convenience
pub use ble::{GattServer, VisibilityScanner, DISTANCE_CHARACTERISTIC_UUID, DISTANCE_SERVICE_UUID};
pub use config::{BleConfig, Config, SensorConfig};
pub use data::{DistanceSample, ReadingSnapshot, SharedReading};
pub use error::{Error, Result};
pub use publisher::{encode_sample, ReadingPublisher};
pub use sampling::{SamplingHandle, SamplingLoop, StopSignal};
pub use shutdown::ShutdownSignals;
pub use sensor::{
    DistanceSampler, Level, MeasurementError, MonotonicClock, PulseTimer, RpiLines,
    SamplerTiming, SensorLines,
};
