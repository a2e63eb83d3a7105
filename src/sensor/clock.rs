//! Time source for pulse timing.

use std::ops::Sub;
use std::time::{Duration, Instant};

/// Point in time relative to a clock's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// Timestamp at the given offset from the clock origin.
    pub const fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }

    /// Offset from the clock origin.
    pub fn offset(&self) -> Duration {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.saturating_since(rhs)
    }
}

/// Monotonic time source with blocking delays.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;

    /// Block the calling thread for at least `duration`.
    fn delay(&self, duration: Duration);
}

/// Delays shorter than this are busy-waited; `thread::sleep` overshoots
/// microsecond delays by tens of microseconds on Linux.
const SPIN_THRESHOLD: Duration = Duration::from_millis(1);

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }

    fn delay(&self, duration: Duration) {
        if duration >= SPIN_THRESHOLD {
            std::thread::sleep(duration);
            return;
        }
        let start = Instant::now();
        while start.elapsed() < duration {
            std::hint::spin_loop();
        }
    }
}
