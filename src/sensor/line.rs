//! Digital line abstraction for the trigger and echo pins.

use std::fmt;
use thiserror::Error;

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Line is low.
    Low,
    /// Line is high.
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

impl From<rppal::gpio::Level> for Level {
    fn from(level: rppal::gpio::Level) -> Self {
        match level {
            rppal::gpio::Level::Low => Self::Low,
            rppal::gpio::Level::High => Self::High,
        }
    }
}

/// Failure to drive or sample a line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line fault: {message}")]
pub struct LineError {
    /// Description of the fault.
    pub message: String,
}

impl LineError {
    /// Create a new line error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The two lines of an HC-SR04: trigger (driven by the host) and echo
/// (driven by the sensor).
///
/// Implementations release their hardware when dropped.
#[cfg_attr(test, mockall::automock)]
pub trait SensorLines: Send {
    /// Drive the trigger line.
    fn set_trigger(&mut self, level: Level) -> Result<(), LineError>;

    /// Sample the echo line.
    fn read_echo(&mut self) -> Result<Level, LineError>;
}

impl<T: SensorLines + ?Sized> SensorLines for Box<T> {
    fn set_trigger(&mut self, level: Level) -> Result<(), LineError> {
        (**self).set_trigger(level)
    }

    fn read_echo(&mut self) -> Result<Level, LineError> {
        (**self).read_echo()
    }
}
