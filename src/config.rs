//! Runtime configuration.
//!
//! Defaults match the reference wiring (trigger on BCM 23, echo on BCM 24)
//! and the HC-SR04 timing requirements. Any value can be overridden from the
//! environment with [`Config::from_env`].

use std::time::Duration;

use crate::error::{Error, Result};

/// Advertised BLE device name. Companion apps pair against this exact
/// string, spelling included.
pub const DEFAULT_DEVICE_NAME: &str = "SmartAssebility-RPi";

/// Environment variable overriding the trigger pin (BCM numbering).
pub const ENV_TRIGGER_PIN: &str = "RANGEFINDER_TRIGGER_PIN";
/// Environment variable overriding the echo pin (BCM numbering).
pub const ENV_ECHO_PIN: &str = "RANGEFINDER_ECHO_PIN";
/// Environment variable overriding the sampling interval in milliseconds.
pub const ENV_INTERVAL_MS: &str = "RANGEFINDER_INTERVAL_MS";
/// Environment variable overriding the echo timeout in milliseconds.
pub const ENV_ECHO_TIMEOUT_MS: &str = "RANGEFINDER_ECHO_TIMEOUT_MS";
/// Environment variable overriding the advertised device name.
pub const ENV_DEVICE_NAME: &str = "RANGEFINDER_DEVICE_NAME";

/// HC-SR04 wiring and protocol timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    /// BCM number of the trigger (output) pin.
    pub trigger_pin: u8,
    /// BCM number of the echo (input) pin.
    pub echo_pin: u8,
    /// Time the sensor is left idle after the pins are configured.
    pub warmup: Duration,
    /// How long the trigger is held low before each pulse.
    pub trigger_settle: Duration,
    /// Width of the trigger pulse.
    pub trigger_pulse: Duration,
    /// Bound on each of the two echo edge waits.
    pub echo_timeout: Duration,
    /// Pause between two measurement cycles.
    pub sample_interval: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            trigger_pin: 23,
            echo_pin: 24,
            warmup: Duration::from_millis(500),
            trigger_settle: Duration::from_millis(2),
            trigger_pulse: Duration::from_micros(10),
            echo_timeout: Duration::from_millis(100),
            sample_interval: Duration::from_millis(500),
        }
    }
}

/// BLE peripheral settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleConfig {
    /// Local name put in the advertisement.
    pub device_name: String,
    /// How often notify sessions check for a new reading.
    pub notify_interval: Duration,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            notify_interval: Duration::from_millis(500),
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Sensor settings.
    pub sensor: SensorConfig,
    /// BLE settings.
    pub ble: BleConfig,
}

impl Config {
    /// Build a configuration from defaults overridden by `RANGEFINDER_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if a variable is set but cannot be
    /// parsed, or if the resulting configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SensorConfig::default();
        let trigger_pin = parse_var(&lookup, ENV_TRIGGER_PIN)?.unwrap_or(defaults.trigger_pin);
        let echo_pin = parse_var(&lookup, ENV_ECHO_PIN)?.unwrap_or(defaults.echo_pin);
        let mut config = Self::default().with_pins(trigger_pin, echo_pin);

        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_INTERVAL_MS)? {
            config = config.with_sample_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_ECHO_TIMEOUT_MS)? {
            config.sensor.echo_timeout = Duration::from_millis(ms);
        }
        if let Some(name) = lookup(ENV_DEVICE_NAME) {
            config = config.with_device_name(name);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the GPIO pins.
    pub fn with_pins(mut self, trigger_pin: u8, echo_pin: u8) -> Self {
        self.sensor.trigger_pin = trigger_pin;
        self.sensor.echo_pin = echo_pin;
        self
    }

    /// Set the sampling interval. Notify sessions follow the same cadence.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sensor.sample_interval = interval;
        self.ble.notify_interval = interval;
        self
    }

    /// Set the advertised device name.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.ble.device_name = name.into();
        self
    }

    /// Check the configuration for values the hardware cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sensor.trigger_pin == self.sensor.echo_pin {
            return Err(Error::InvalidParameter {
                name: "echo_pin".to_string(),
                value: format!("{} (same as trigger_pin)", self.sensor.echo_pin),
            });
        }

        let durations = [
            ("trigger_pulse", self.sensor.trigger_pulse),
            ("echo_timeout", self.sensor.echo_timeout),
            ("sample_interval", self.sensor.sample_interval),
            ("notify_interval", self.ble.notify_interval),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(Error::InvalidParameter {
                name: name.to_string(),
                value: "0".to_string(),
            });
        }

        if self.ble.device_name.is_empty() {
            return Err(Error::InvalidParameter {
                name: "device_name".to_string(),
                value: String::new(),
            });
        }

        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidParameter {
                name: key.to_string(),
                value: raw,
            }),
    }
}
