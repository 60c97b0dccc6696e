//! Multi-frame accumulation of blob observations into target estimates.

use serde::{Deserialize, Serialize};
use shared::blob::PixelObservation;

/// How a blob in a new frame is matched to an existing estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatchingStrategy {
    /// Blob `i` of every frame goes to slot `i`.
    ///
    /// Only correct if the vision service reports targets in the same order
    /// every frame.
    Positional,
    /// Blob joins the closest estimate within `gate_px` that has not been fed
    /// in this frame, or opens a new one.
    NearestNeighbor { gate_px: f64 },
}

impl Default for MatchingStrategy {
    fn default() -> Self {
        MatchingStrategy::NearestNeighbor { gate_px: 25.0 }
    }
}

/// Running pixel sums for one physical target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetEstimate {
    sum_x: f64,
    sum_y: f64,
    frame_count: usize,
}

impl TargetEstimate {
    pub fn observe(&mut self, px: f64, py: f64) {
        self.sum_x += px;
        self.sum_y += py;
        self.frame_count += 1;
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Mean pixel position, or `None` before the first observation.
    pub fn mean(&self) -> Option<(f64, f64)> {
        if self.frame_count == 0 {
            return None;
        }
        let n = self.frame_count as f64;
        Some((self.sum_x / n, self.sum_y / n))
    }

    /// Freeze into a [`Target`].
    pub fn finalize(&self) -> Option<Target> {
        self.mean().map(|(px, py)| Target {
            px,
            py,
            frame_count: self.frame_count,
        })
    }
}

/// Averaged pixel position of one target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub px: f64,
    pub py: f64,
    /// Number of frames that contributed
    pub frame_count: usize,
}

impl Target {
    pub fn distance_to(&self, reference: (f64, f64)) -> f64 {
        (self.px - reference.0).hypot(self.py - reference.1)
    }
}

/// Outcome of feeding one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameMatchStats {
    pub matched: usize,
    pub opened: usize,
    pub dropped: usize,
}

/// Owns the estimates while frames are being accumulated.
#[derive(Debug, Clone)]
pub struct TargetAccumulator {
    strategy: MatchingStrategy,
    max_targets: usize,
    slots: Vec<TargetEstimate>,
}

impl TargetAccumulator {
    pub fn new(strategy: MatchingStrategy, max_targets: usize) -> Self {
        let slots = match strategy {
            MatchingStrategy::Positional => vec![TargetEstimate::default(); max_targets],
            MatchingStrategy::NearestNeighbor { .. } => Vec::with_capacity(max_targets),
        };
        Self {
            strategy,
            max_targets,
            slots,
        }
    }

    pub fn estimates(&self) -> &[TargetEstimate] {
        &self.slots
    }

    /// Fold one frame's blobs into the estimates.
    pub fn add_frame(&mut self, blobs: &[PixelObservation]) -> FrameMatchStats {
        match self.strategy {
            MatchingStrategy::Positional => self.add_positional(blobs),
            MatchingStrategy::NearestNeighbor { gate_px } => self.add_nearest(blobs, gate_px),
        }
    }

    fn add_positional(&mut self, blobs: &[PixelObservation]) -> FrameMatchStats {
        let mut stats = FrameMatchStats::default();
        for (slot, blob) in self.slots.iter_mut().zip(blobs) {
            slot.observe(blob.px, blob.py);
            stats.matched += 1;
        }
        stats.dropped = blobs.len().saturating_sub(self.slots.len());
        if stats.dropped > 0 {
            log::debug!("Ignoring {} blobs beyond slot {}", stats.dropped, self.max_targets);
        }
        stats
    }

    fn add_nearest(&mut self, blobs: &[PixelObservation], gate_px: f64) -> FrameMatchStats {
        let mut stats = FrameMatchStats::default();
        let mut fed = vec![false; self.slots.len()];

        for blob in blobs {
            let nearest = self
                .slots
                .iter()
                .enumerate()
                .filter(|(i, _)| !fed[*i])
                .filter_map(|(i, slot)| slot.mean().map(|(x, y)| (i, blob.distance_to(x, y))))
                .filter(|(_, d)| *d <= gate_px)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((i, _)) = nearest {
                self.slots[i].observe(blob.px, blob.py);
                fed[i] = true;
                stats.matched += 1;
            } else if self.slots.len() < self.max_targets {
                let mut slot = TargetEstimate::default();
                slot.observe(blob.px, blob.py);
                self.slots.push(slot);
                fed.push(true);
                stats.opened += 1;
            } else {
                log::debug!(
                    "Dropping blob at ({:.1}, {:.1}): no free estimate within {gate_px} px",
                    blob.px,
                    blob.py
                );
                stats.dropped += 1;
            }
        }
        stats
    }

    /// Average every estimate with at least `min_observations` frames.
    ///
    /// Estimates that never received a sample are always dropped.
    pub fn finalize(&self, min_observations: usize) -> Vec<Target> {
        let min = min_observations.max(1);
        self.slots
            .iter()
            .filter(|slot| {
                let keep = slot.frame_count() >= min;
                if !keep && slot.frame_count() > 0 {
                    log::warn!(
                        "Dropping target seen in only {} frame(s) (need {min})",
                        slot.frame_count()
                    );
                }
                keep
            })
            .filter_map(TargetEstimate::finalize)
            .collect()
    }
}
