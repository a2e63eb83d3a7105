//! Raspberry Pi GPIO backend.

use rppal::gpio::{Gpio, InputPin, OutputPin};
use std::time::Duration;
use tracing::{debug, info};

use super::line::{Level, LineError, SensorLines};
use crate::config::SensorConfig;
use crate::error::Result;

/// HC-SR04 wired to two BCM pins through `rppal`.
///
/// The pins are claimed for the lifetime of this value. On drop the trigger
/// is driven low and both pins return to their previous mode.
pub struct RpiLines {
    trigger: OutputPin,
    echo: InputPin,
}

impl RpiLines {
    /// Claim the trigger and echo pins, drive the trigger low and let the
    /// sensor settle for `warmup`. Blocks the calling thread for the
    /// warm-up; from async code run it with
    /// [`crate::shutdown::run_blocking`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Gpio`] if the GPIO peripheral is unavailable
    /// or a pin is already in use.
    pub fn open(trigger_pin: u8, echo_pin: u8, warmup: Duration) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut trigger = gpio.get(trigger_pin)?.into_output_low();
        trigger.set_reset_on_drop(true);
        let echo = gpio.get(echo_pin)?.into_input();

        info!(
            "GPIO ready (trigger BCM {}, echo BCM {}), waiting {:?} for sensor to settle",
            trigger_pin, echo_pin, warmup
        );
        std::thread::sleep(warmup);

        Ok(Self { trigger, echo })
    }

    /// Claim the pins named in `config`.
    pub fn from_config(config: &SensorConfig) -> Result<Self> {
        Self::open(config.trigger_pin, config.echo_pin, config.warmup)
    }
}

impl SensorLines for RpiLines {
    fn set_trigger(&mut self, level: Level) -> std::result::Result<(), LineError> {
        match level {
            Level::Low => self.trigger.set_low(),
            Level::High => self.trigger.set_high(),
        }
        Ok(())
    }

    fn read_echo(&mut self) -> std::result::Result<Level, LineError> {
        Ok(self.echo.read().into())
    }
}

impl Drop for RpiLines {
    fn drop(&mut self) {
        self.trigger.set_low();
        debug!(
            "Releasing GPIO pins {} and {}",
            self.trigger.pin(),
            self.echo.pin()
        );
    }
}
