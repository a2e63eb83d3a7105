//! HC-SR04 pulse-echo ranging.
//!
//! One measurement: hold the trigger low to settle, raise it for 10 µs, then
//! time how long the echo line stays high. The echo width is the round trip
//! of the ultrasonic burst, so the distance is `width × 343 m/s / 2`, which
//! is 17150 cm per second of echo.

use std::time::Duration;
use thiserror::Error;
use tracing::trace;

use super::clock::{Clock, MonotonicClock};
use super::line::{Level, LineError, SensorLines};
use super::pulse::{PulseError, PulseTimer};
use crate::config::SensorConfig;
use crate::data::DistanceSample;

/// Half the speed of sound in centimetres per second.
pub const HALF_SPEED_OF_SOUND_CM_PER_S: u32 = 17_150;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Why a measurement produced no sample.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    /// The echo line never went high after the trigger pulse.
    #[error("timed out waiting for echo start")]
    EchoStartTimeout,

    /// The echo line went high but did not return low in time.
    #[error("timed out waiting for echo end")]
    EchoEndTimeout,

    /// The echo width maps to a distance the sensor cannot measure.
    #[error("reading out of range: {0:.1} cm")]
    OutOfRange(f64),

    /// Reading or driving a line failed.
    #[error("unexpected sensor fault: {0}")]
    UnexpectedFault(#[from] LineError),
}

impl MeasurementError {
    /// Expected failures (timeouts, out-of-range) as opposed to hardware
    /// faults. Used to pick the log level.
    pub fn is_diagnostic(&self) -> bool {
        !matches!(self, Self::UnexpectedFault(_))
    }
}

/// Convert an echo width to tenths of a centimetre, rounding half up.
///
/// Computed on integer nanoseconds so the rounding rule is exact.
pub fn echo_to_tenths(echo: Duration) -> u64 {
    let tenths_per_second = u128::from(HALF_SPEED_OF_SOUND_CM_PER_S) * 10;
    let scaled = echo.as_nanos() * tenths_per_second + NANOS_PER_SECOND / 2;
    u64::try_from(scaled / NANOS_PER_SECOND).unwrap_or(u64::MAX)
}

/// Protocol timings used by [`DistanceSampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerTiming {
    /// Low time before the trigger pulse.
    pub trigger_settle: Duration,
    /// Trigger pulse width.
    pub trigger_pulse: Duration,
    /// Bound on each echo edge wait.
    pub echo_timeout: Duration,
}

impl Default for SamplerTiming {
    fn default() -> Self {
        SamplerTiming::from(&SensorConfig::default())
    }
}

impl From<&SensorConfig> for SamplerTiming {
    fn from(config: &SensorConfig) -> Self {
        Self {
            trigger_settle: config.trigger_settle,
            trigger_pulse: config.trigger_pulse,
            echo_timeout: config.echo_timeout,
        }
    }
}

/// HC-SR04 driver over a pair of [`SensorLines`].
///
/// Owns the lines; dropping the sampler releases them.
pub struct DistanceSampler<L, C = MonotonicClock> {
    lines: L,
    timer: PulseTimer<C>,
    timing: SamplerTiming,
}

impl<L: SensorLines> DistanceSampler<L, MonotonicClock> {
    /// Create a sampler on the system monotonic clock.
    pub fn new(lines: L, timing: SamplerTiming) -> Self {
        Self::with_clock(lines, MonotonicClock::new(), timing)
    }
}

impl<L: SensorLines, C: Clock> DistanceSampler<L, C> {
    /// Create a sampler on a specific clock.
    pub fn with_clock(lines: L, clock: C, timing: SamplerTiming) -> Self {
        Self {
            lines,
            timer: PulseTimer::new(clock),
            timing,
        }
    }

    /// Timings in use.
    pub fn timing(&self) -> SamplerTiming {
        self.timing
    }

    /// Perform one measurement.
    ///
    /// # Errors
    ///
    /// See [`MeasurementError`]. None of them leave the sensor in a state
    /// that prevents the next measurement.
    pub fn measure(&mut self) -> Result<DistanceSample, MeasurementError> {
        let clock = self.timer.clock();

        self.lines.set_trigger(Level::Low)?;
        clock.delay(self.timing.trigger_settle);

        self.lines.set_trigger(Level::High)?;
        clock.delay(self.timing.trigger_pulse);
        self.lines.set_trigger(Level::Low)?;

        let start = self
            .timer
            .await_edge(&mut self.lines, Level::High, self.timing.echo_timeout)
            .map_err(|e| match e {
                PulseError::TimedOut { .. } => MeasurementError::EchoStartTimeout,
                PulseError::Line(fault) => MeasurementError::UnexpectedFault(fault),
            })?;

        let end = self
            .timer
            .await_edge(&mut self.lines, Level::Low, self.timing.echo_timeout)
            .map_err(|e| match e {
                PulseError::TimedOut { .. } => MeasurementError::EchoEndTimeout,
                PulseError::Line(fault) => MeasurementError::UnexpectedFault(fault),
            })?;

        let echo = end - start;
        let tenths = echo_to_tenths(echo);
        trace!("Echo width {:?} -> {} tenths of a cm", echo, tenths);

        u32::try_from(tenths)
            .ok()
            .and_then(DistanceSample::from_tenths)
            .ok_or(MeasurementError::OutOfRange(tenths as f64 / 10.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::line::MockSensorLines;
    use crate::sensor::sim::{SimClock, SimLines};
    use proptest::prelude::*;
    use std::time::Instant;

    fn sim_sampler(width: Duration) -> DistanceSampler<SimLines, SimClock> {
        let clock = SimClock::new(Duration::from_micros(1));
        let lines = SimLines::echo_pulse(clock.clone(), width);
        DistanceSampler::with_clock(lines, clock, SamplerTiming::default())
    }

    #[test]
    fn test_echo_conversion_rounding() {
        assert_eq!(echo_to_tenths(Duration::from_micros(1_000)), 172);
        assert_eq!(echo_to_tenths(Duration::from_micros(50_000)), 8_575);
        assert_eq!(echo_to_tenths(Duration::ZERO), 0);
        // 113 µs -> 1.938 cm, 114 µs -> 1.955 cm
        assert_eq!(echo_to_tenths(Duration::from_micros(113)), 19);
        assert_eq!(echo_to_tenths(Duration::from_micros(114)), 20);
        assert_eq!(echo_to_tenths(Duration::from_micros(23_326)), 4_000);
        assert_eq!(echo_to_tenths(Duration::from_micros(23_327)), 4_001);
    }

    #[test]
    fn test_conversion_follows_speed_of_sound() {
        let one_second = echo_to_tenths(Duration::from_secs(1));
        assert_eq!(one_second, u64::from(HALF_SPEED_OF_SOUND_CM_PER_S) * 10);
        // 1 ms is exactly 171.5 tenths; halves round up.
        assert_eq!(echo_to_tenths(Duration::from_millis(1)), 172);
        assert_eq!(echo_to_tenths(Duration::from_nanos(999_999)), 171);
    }

    #[test]
    fn test_one_millisecond_echo_is_valid() {
        let mut sampler = sim_sampler(Duration::from_micros(1_000));
        let sample = sampler.measure().unwrap();
        assert!(sample.is_valid());
        let cm = sample.distance_cm().unwrap();
        assert!((cm - 17.15).abs() <= 0.1);
        assert_eq!(cm, 17.2);
    }

    #[test]
    fn test_fifty_millisecond_echo_is_out_of_range() {
        let mut sampler = sim_sampler(Duration::from_micros(50_000));
        assert_eq!(
            sampler.measure(),
            Err(MeasurementError::OutOfRange(857.5))
        );
    }

    #[test]
    fn test_stuck_low_echo_times_out_on_start() {
        let clock = SimClock::new(Duration::from_micros(1));
        let lines = SimLines::stuck(clock.clone(), Level::Low);
        let mut sampler = DistanceSampler::with_clock(lines, clock.clone(), SamplerTiming::default());

        assert_eq!(sampler.measure(), Err(MeasurementError::EchoStartTimeout));
        // settle + pulse + echo timeout, plus one poll step
        let elapsed = clock.elapsed();
        assert!(elapsed > Duration::from_micros(102_010));
        assert!(elapsed <= Duration::from_micros(102_012));
    }

    #[test]
    fn test_stuck_low_echo_times_out_in_wall_time() {
        let clock = SimClock::new(Duration::from_micros(1));
        let lines = SimLines::stuck(clock, Level::Low);
        let mut sampler = DistanceSampler::new(lines, SamplerTiming::default());

        let started = Instant::now();
        assert_eq!(sampler.measure(), Err(MeasurementError::EchoStartTimeout));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");
    }

    #[test]
    fn test_echo_that_never_falls_times_out_on_end() {
        let clock = SimClock::new(Duration::from_micros(1));
        let lines = SimLines::with_echo(clock.clone(), Duration::from_micros(200), None);
        let mut sampler = DistanceSampler::with_clock(lines, clock, SamplerTiming::default());

        assert_eq!(sampler.measure(), Err(MeasurementError::EchoEndTimeout));
    }

    #[test]
    fn test_trigger_sequence() {
        let clock = SimClock::new(Duration::from_micros(1));
        let lines = SimLines::echo_pulse(clock.clone(), Duration::from_micros(500));
        let log = lines.trigger_log();
        let mut sampler = DistanceSampler::with_clock(lines, clock, SamplerTiming::default());

        sampler.measure().unwrap();

        let log = log.lock().clone();
        assert_eq!(
            log,
            vec![
                (Duration::ZERO, Level::Low),
                (Duration::from_millis(2), Level::High),
                (Duration::from_micros(2_010), Level::Low),
            ]
        );
    }

    #[test]
    fn test_consecutive_measurements() {
        let mut sampler = sim_sampler(Duration::from_micros(5_831));
        for _ in 0..3 {
            assert_eq!(sampler.measure().unwrap().distance_cm(), Some(100.0));
        }
    }

    #[test]
    fn test_line_fault_is_unexpected() {
        let mut lines = MockSensorLines::new();
        lines.expect_set_trigger().returning(|_| Ok(()));
        lines
            .expect_read_echo()
            .returning(|| Err(LineError::new("echo pin unexported")));
        let clock = SimClock::new(Duration::from_micros(1));
        let mut sampler = DistanceSampler::with_clock(lines, clock, SamplerTiming::default());

        let err = sampler.measure().unwrap_err();
        assert!(!err.is_diagnostic());
        assert!(matches!(err, MeasurementError::UnexpectedFault(_)));
    }

    #[test]
    fn test_trigger_fault_is_unexpected() {
        let mut lines = MockSensorLines::new();
        lines
            .expect_set_trigger()
            .times(1)
            .returning(|_| Err(LineError::new("trigger busy")));
        lines.expect_read_echo().never();
        let clock = SimClock::new(Duration::from_micros(1));
        let mut sampler = DistanceSampler::with_clock(lines, clock, SamplerTiming::default());

        assert_eq!(
            sampler.measure(),
            Err(MeasurementError::UnexpectedFault(LineError::new("trigger busy")))
        );
    }

    #[test]
    fn test_diagnostic_classification() {
        assert!(MeasurementError::EchoStartTimeout.is_diagnostic());
        assert!(MeasurementError::EchoEndTimeout.is_diagnostic());
        assert!(MeasurementError::OutOfRange(0.5).is_diagnostic());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_in_range_widths_are_valid(width_us in 114u64..=23_326) {
            let mut sampler = sim_sampler(Duration::from_micros(width_us));
            let sample = sampler.measure().unwrap();
            prop_assert!(sample.is_valid());
            let expected = width_us as f64 * 1e-6 * f64::from(HALF_SPEED_OF_SOUND_CM_PER_S);
            let cm = sample.distance_cm().unwrap();
            prop_assert!((cm - expected).abs() <= 0.05 + 1e-9, "{} vs {}", cm, expected);
        }

        #[test]
        fn prop_too_close_is_out_of_range(width_us in 1u64..=113) {
            let mut sampler = sim_sampler(Duration::from_micros(width_us));
            let result = sampler.measure();
            prop_assert!(
                matches!(result, Err(MeasurementError::OutOfRange(cm)) if cm < 2.0),
                "{:?}", result
            );
        }

        #[test]
        fn prop_too_far_is_out_of_range(width_us in 23_327u64..=99_000) {
            let mut sampler = sim_sampler(Duration::from_micros(width_us));
            let result = sampler.measure();
            prop_assert!(
                matches!(result, Err(MeasurementError::OutOfRange(cm)) if cm > 400.0),
                "{:?}", result
            );
        }
    }
}
