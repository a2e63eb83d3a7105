//! HC-SR04 ultrasonic sensor support.
//!
//! The sensor is driven through the [`SensorLines`] trait so the timing code
//! runs unchanged against real GPIO ([`RpiLines`]) or a simulation in tests.

pub mod clock;
pub mod hcsr04;
pub mod line;
pub mod pulse;
pub mod rpi;

#[cfg(test)]
pub(crate) mod sim;

pub use clock::{Clock, MonotonicClock, Timestamp};
pub use hcsr04::{echo_to_tenths, DistanceSampler, MeasurementError, SamplerTiming};
pub use line::{Level, LineError, SensorLines};
pub use pulse::{PulseError, PulseTimer};
pub use rpi::RpiLines;
