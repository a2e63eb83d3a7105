//! Deterministic stand-ins for the clock and the sensor lines.
//!
//! Every echo poll advances the simulated clock by a fixed step, so pulse
//! widths measured against [`SimLines`] are exact multiples of that step.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::clock::{Clock, Timestamp};
use super::line::{Level, LineError, SensorLines};

/// Simulated clock shared between a sampler and its [`SimLines`].
#[derive(Debug, Clone)]
pub struct SimClock {
    now_ns: Arc<AtomicU64>,
    poll_step: Duration,
}

impl SimClock {
    pub fn new(poll_step: Duration) -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(0)),
            poll_step,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ns.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }
}

impl Clock for SimClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_offset(self.elapsed())
    }

    fn delay(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[derive(Debug, Clone, Copy)]
enum Echo {
    Stuck(Level),
    Pulse {
        lead: Duration,
        width: Option<Duration>,
    },
}

/// Simulated HC-SR04.
///
/// A falling trigger edge after a high level arms the sensor; the echo then
/// rises `lead` later and stays high for `width` (forever if `None`).
pub struct SimLines {
    clock: SimClock,
    echo: Echo,
    trigger: Level,
    armed_at: Option<Duration>,
    trigger_log: Arc<Mutex<Vec<(Duration, Level)>>>,
    released: Arc<AtomicUsize>,
}

impl SimLines {
    /// Echo pulse of `width` starting 200 µs after the trigger.
    pub fn echo_pulse(clock: SimClock, width: Duration) -> Self {
        Self::with_echo(clock, Duration::from_micros(200), Some(width))
    }

    pub fn with_echo(clock: SimClock, lead: Duration, width: Option<Duration>) -> Self {
        Self::build(clock, Echo::Pulse { lead, width })
    }

    /// Echo line that never changes.
    pub fn stuck(clock: SimClock, level: Level) -> Self {
        Self::build(clock, Echo::Stuck(level))
    }

    fn build(clock: SimClock, echo: Echo) -> Self {
        Self {
            clock,
            echo,
            trigger: Level::Low,
            armed_at: None,
            trigger_log: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter incremented when these lines are dropped.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        self.released.clone()
    }

    /// Every trigger write with its simulated time.
    pub fn trigger_log(&self) -> Arc<Mutex<Vec<(Duration, Level)>>> {
        self.trigger_log.clone()
    }

    fn echo_level(&self, at: Duration) -> Level {
        match (self.echo, self.armed_at) {
            (Echo::Stuck(level), _) => level,
            (Echo::Pulse { .. }, None) => Level::Low,
            (Echo::Pulse { lead, width }, Some(armed)) => {
                let rise = armed + lead;
                let high = at >= rise && width.map_or(true, |w| at < rise + w);
                if high {
                    Level::High
                } else {
                    Level::Low
                }
            }
        }
    }
}

impl SensorLines for SimLines {
    fn set_trigger(&mut self, level: Level) -> Result<(), LineError> {
        let now = self.clock.elapsed();
        if self.trigger == Level::High && level == Level::Low {
            self.armed_at = Some(now);
        }
        self.trigger = level;
        self.trigger_log.lock().push((now, level));
        Ok(())
    }

    fn read_echo(&mut self) -> Result<Level, LineError> {
        let level = self.echo_level(self.clock.elapsed());
        self.clock.advance(self.clock.poll_step);
        Ok(level)
    }
}

impl Drop for SimLines {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
