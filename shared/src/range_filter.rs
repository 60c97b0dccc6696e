//! Fixed-capacity moving average for noisy distance samples.
//!
//! The filter keeps the last `capacity` range readings in a circular slot
//! array together with their running sum. Each ingest overwrites the oldest
//! slot and reports `sum / capacity`.
//!
//! # Divisor
//!
//! The average always divides by the *capacity*, not by the number of samples
//! seen so far. Until the buffer has wrapped once, readings are biased toward
//! zero (a single 5 cm sample into a 10-slot filter reports 0.5 cm). Callers
//! that need an unbiased first reading should prime the filter with
//! `capacity` samples before using its output.

use thiserror::Error;

/// Default number of slots in a [`RangeFilter`].
pub const DEFAULT_RANGE_FILTER_CAPACITY: usize = 10;

/// The filter was asked for a distance before any sample was ingested.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("range filter has not ingested any samples")]
pub struct RangeFilterEmpty;

/// Moving-average filter over the last N distance samples (centimeters).
///
/// Storage is allocated once at construction; ingesting never allocates.
/// A filter instance has a single owner and is not meant to be shared between
/// threads of control.
#[derive(Debug, Clone)]
pub struct RangeFilter {
    slots: Box<[f64]>,
    /// Index of the slot that the next sample overwrites
    next: usize,
    /// Number of samples ingested, saturating at capacity
    filled: usize,
    /// Running sum of slot contents, updated incrementally
    sum: f64,
}

impl RangeFilter {
    /// Creates an empty filter with `capacity` slots.
    ///
    /// # Panics
    /// Panics if capacity is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RangeFilter capacity must be greater than 0");
        Self {
            slots: vec![0.0; capacity].into_boxed_slice(),
            next: 0,
            filled: 0,
            sum: 0.0,
        }
    }

    /// Ingests a sample and returns `sum / capacity`.
    pub fn ingest(&mut self, sample: f64) -> f64 {
        let evicted = self.slots[self.next];
        self.slots[self.next] = sample;
        self.sum += sample - evicted;

        self.next = (self.next + 1) % self.slots.len();
        if self.filled < self.slots.len() {
            self.filled += 1;
        }

        self.sum / self.slots.len() as f64
    }

    /// Current filter output without ingesting anything.
    pub fn average(&self) -> Result<f64, RangeFilterEmpty> {
        if self.filled == 0 {
            return Err(RangeFilterEmpty);
        }
        Ok(self.sum / self.slots.len() as f64)
    }

    /// Running sum of the slot contents.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Number of samples currently held (at most the capacity).
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Returns true if no sample has been ingested since construction or reset.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Returns true once every slot holds a real sample.
    pub fn is_primed(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drops all samples and zeroes the running sum.
    pub fn reset(&mut self) {
        self.slots.fill(0.0);
        self.next = 0;
        self.filled = 0;
        self.sum = 0.0;
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE_FILTER_CAPACITY)
    }
}
