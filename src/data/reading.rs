//! Latest-value cell shared between the sampling thread and BLE callbacks.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use super::sample::DistanceSample;

/// Consistent view of the shared reading at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingSnapshot {
    /// Most recently published sample.
    pub sample: DistanceSample,
    /// Number of publishes so far. `0` means nothing was ever published.
    pub sequence: u64,
    /// Wall-clock time of the last publish.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ReadingSnapshot {
    const EMPTY: Self = Self {
        sample: DistanceSample::NONE,
        sequence: 0,
        updated_at: None,
    };

    /// Whether any sample has been published yet.
    pub fn has_sample(&self) -> bool {
        self.sequence > 0
    }
}

/// Handle onto the single most recent [`DistanceSample`].
///
/// Clones share the same cell. One writer (the sampling loop) overwrites the
/// value; any number of readers observe it. The whole snapshot is replaced
/// under one lock, so a reader sees either the previous or the new value and
/// never a mix of the two.
#[derive(Debug, Clone)]
pub struct SharedReading {
    inner: Arc<RwLock<ReadingSnapshot>>,
}

impl SharedReading {
    /// Create a cell holding "no sample yet".
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ReadingSnapshot::EMPTY)),
        }
    }

    /// Overwrite the current sample. Returns the new sequence number.
    pub fn publish(&self, sample: DistanceSample) -> u64 {
        let mut state = self.inner.write();
        state.sample = sample;
        state.sequence += 1;
        state.updated_at = Some(Utc::now());
        state.sequence
    }

    /// The most recently published sample, or [`DistanceSample::NONE`].
    pub fn current(&self) -> DistanceSample {
        self.inner.read().sample
    }

    /// Sample, sequence and timestamp read together.
    pub fn snapshot(&self) -> ReadingSnapshot {
        *self.inner.read()
    }
}

impl Default for SharedReading {
    fn default() -> Self {
        Self::new()
    }
}
