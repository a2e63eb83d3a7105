//! Background measurement loop.
//!
//! The loop runs on its own OS thread because each measurement busy-waits on
//! the echo line for up to twice the echo timeout; that must never happen on
//! the thread that services BLE requests.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::data::SharedReading;
use crate::error::Result;
use crate::sensor::{Clock, DistanceSampler, MeasurementError, SensorLines};

/// Name of the sampling thread.
pub const SAMPLER_THREAD_NAME: &str = "distance-sampler";

/// Cross-thread stop flag whose waits wake up as soon as it is raised.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    /// Create a lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every waiter.
    pub fn raise(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock() = true;
        condvar.notify_all();
    }

    /// Whether the signal has been raised.
    pub fn is_raised(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Wait up to `timeout` for the signal. Returns `true` if it was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let mut raised = flag.lock();
        if !*raised {
            condvar.wait_while_for(&mut raised, |raised| !*raised, timeout);
        }
        *raised
    }
}

/// Result of one sampling cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A sample was published with this sequence number.
    Published(u64),
    /// The measurement failed; the shared reading was left untouched.
    Dropped(MeasurementError),
}

/// Repeatedly measures and publishes into a [`SharedReading`].
pub struct SamplingLoop<L, C> {
    sampler: DistanceSampler<L, C>,
    reading: SharedReading,
    interval: Duration,
    cycles: u64,
}

impl<L, C> SamplingLoop<L, C>
where
    L: SensorLines + 'static,
    C: Clock + 'static,
{
    /// Create a loop that measures every `interval`.
    pub fn new(sampler: DistanceSampler<L, C>, reading: SharedReading, interval: Duration) -> Self {
        Self {
            sampler,
            reading,
            interval,
            cycles: 0,
        }
    }

    /// Run a single measure-and-publish cycle.
    ///
    /// Failures are logged and swallowed: line faults at error level on every
    /// cycle, timeouts and out-of-range readings at debug level. The first
    /// cycle is reported as the sensor self-test.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let self_test = self.cycles == 0;
        self.cycles += 1;

        match self.sampler.measure() {
            Ok(sample) => {
                let sequence = self.reading.publish(sample);
                if self_test {
                    info!("Sensor self-test OK: {}", sample);
                } else {
                    debug!("Distance updated: {} (#{})", sample, sequence);
                }
                CycleOutcome::Published(sequence)
            }
            Err(e) => {
                if !e.is_diagnostic() {
                    error!("Measurement failed: {}", e);
                } else if self_test {
                    warn!("Sensor self-test failed ({}), check the sensor wiring", e);
                } else {
                    debug!("No distance this cycle: {}", e);
                }
                CycleOutcome::Dropped(e)
            }
        }
    }

    /// Run cycles until `stop` is raised. The signal is checked after every
    /// cycle and interrupts the inter-cycle pause.
    pub fn run(&mut self, stop: &StopSignal) {
        info!("Sampling every {:?}", self.interval);

        while !stop.is_raised() {
            self.run_cycle();
            if stop.wait_timeout(self.interval) {
                break;
            }
        }

        info!("Sampling stopped after {} cycles", self.cycles);
    }

    /// Move the loop onto a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the thread cannot be spawned.
    pub fn spawn(mut self) -> Result<SamplingHandle> {
        let stop = StopSignal::new();
        let thread_stop = stop.clone();

        let thread = thread::Builder::new()
            .name(SAMPLER_THREAD_NAME.to_string())
            .spawn(move || {
                self.run(&thread_stop);
                // `self` and the sampler's lines are dropped here, on the
                // sampling thread, before `join` returns.
            })?;

        Ok(SamplingHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Owner of a running sampling thread.
///
/// Stopping (explicitly or by dropping the handle) raises the stop signal and
/// joins the thread, so the sensor lines have been released once it returns.
/// The join blocks; from async code use [`crate::shutdown::stop_sampling`].
pub struct SamplingHandle {
    stop: StopSignal,
    thread: Option<JoinHandle<()>>,
}

impl SamplingHandle {
    /// Whether the sampling thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Stop the loop and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.stop.raise();
        if thread.join().is_err() {
            error!("Sampling thread panicked");
        } else {
            debug!("Sampling thread joined");
        }
    }
}

impl Drop for SamplingHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
