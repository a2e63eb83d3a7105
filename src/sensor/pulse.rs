//! Bounded busy-wait edge detection.
//!
//! There is no interrupt support on the echo line, so a level transition is
//! found by polling as fast as the line can be read. Every poll also checks
//! the clock, so a disconnected sensor costs at most `timeout` per wait.

use std::time::Duration;
use thiserror::Error;
use tracing::trace;

use super::clock::{Clock, Timestamp};
use super::line::{Level, LineError, SensorLines};

/// Failure while waiting for an edge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PulseError {
    /// The echo line did not reach the expected level in time.
    #[error("timed out after {waited:?}")]
    TimedOut {
        /// Time spent polling.
        waited: Duration,
    },

    /// The echo line could not be read.
    #[error(transparent)]
    Line(#[from] LineError),
}

/// Times level transitions on the echo line.
#[derive(Debug, Clone)]
pub struct PulseTimer<C> {
    clock: C,
}

impl<C: Clock> PulseTimer<C> {
    /// Create a pulse timer on the given clock.
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// The underlying clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Poll the echo line until it reads `expected`.
    ///
    /// Returns the timestamp of the last poll that still saw the opposite
    /// level, which is the closest observation of the moment the line
    /// switched. If the line already reads `expected` on the first poll, the
    /// call time is returned.
    ///
    /// # Errors
    ///
    /// [`PulseError::TimedOut`] once more than `timeout` has elapsed since the
    /// call, [`PulseError::Line`] if a poll fails.
    pub fn await_edge<L>(
        &self,
        lines: &mut L,
        expected: Level,
        timeout: Duration,
    ) -> Result<Timestamp, PulseError>
    where
        L: SensorLines + ?Sized,
    {
        let started = self.clock.now();
        let mut last_before_edge = started;
        let mut polls: u64 = 0;

        loop {
            if lines.read_echo()? == expected {
                trace!(
                    "Echo reached {} after {} polls ({:?})",
                    expected,
                    polls,
                    last_before_edge - started
                );
                return Ok(last_before_edge);
            }
            polls += 1;

            last_before_edge = self.clock.now();
            let waited = last_before_edge - started;
            if waited > timeout {
                return Err(PulseError::TimedOut { waited });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::line::MockSensorLines;
    use crate::sensor::sim::{SimClock, SimLines};

    #[test]
    fn test_returns_last_poll_before_edge() {
        let clock = SimClock::new(Duration::from_micros(1));
        let mut lines = SimLines::with_echo(clock.clone(), Duration::from_micros(300), None);
        let timer = PulseTimer::new(clock.clone());

        // Arm the simulated sensor at t = 0.
        lines.set_trigger(Level::High).unwrap();
        lines.set_trigger(Level::Low).unwrap();

        let edge = timer
            .await_edge(&mut lines, Level::High, Duration::from_millis(100))
            .unwrap();
        assert_eq!(edge.offset(), Duration::from_micros(300));
    }

    #[test]
    fn test_already_at_level_returns_call_time() {
        let clock = SimClock::new(Duration::from_micros(1));
        clock.advance(Duration::from_micros(70));
        let mut lines = SimLines::stuck(clock.clone(), Level::Low);
        let timer = PulseTimer::new(clock);

        let edge = timer
            .await_edge(&mut lines, Level::Low, Duration::from_millis(1))
            .unwrap();
        assert_eq!(edge.offset(), Duration::from_micros(70));
    }

    #[test]
    fn test_times_out_on_stuck_line() {
        let clock = SimClock::new(Duration::from_micros(1));
        let mut lines = SimLines::stuck(clock.clone(), Level::Low);
        let timer = PulseTimer::new(clock.clone());

        let err = timer
            .await_edge(&mut lines, Level::High, Duration::from_millis(100))
            .unwrap_err();
        match err {
            PulseError::TimedOut { waited } => {
                assert!(waited > Duration::from_millis(100));
                assert!(waited <= Duration::from_millis(100) + Duration::from_micros(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_line_fault_propagates() {
        let mut lines = MockSensorLines::new();
        lines
            .expect_read_echo()
            .times(1)
            .returning(|| Err(LineError::new("bus error")));
        let timer = PulseTimer::new(SimClock::new(Duration::from_micros(1)));

        let err = timer
            .await_edge(&mut lines, Level::High, Duration::from_millis(100))
            .unwrap_err();
        assert_eq!(err, PulseError::Line(LineError::new("bus error")));
    }
}
