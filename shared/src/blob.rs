//! Blob observations reported by the vision collaborator and the threshold
//! predicate used to screen them.

use serde::{Deserialize, Serialize};

/// One detected blob in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelObservation {
    /// Centroid column in pixels
    pub px: f64,
    /// Centroid row in pixels
    pub py: f64,
    /// Blob area in square pixels
    pub area: f64,
    /// Roundness score in [0, 1], 1 being a perfect circle
    pub roundness: f64,
}

impl PixelObservation {
    pub fn new(px: f64, py: f64, area: f64, roundness: f64) -> Self {
        Self {
            px,
            py,
            area,
            roundness,
        }
    }

    /// Euclidean pixel distance to `(x, y)`
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.px - x).hypot(self.py - y)
    }
}

/// Axis-aligned pixel rectangle, min inclusive and max exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl RegionOfInterest {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.min_x && px < self.max_x && py >= self.min_y && py < self.max_y
    }
}

/// Threshold predicate applied to blobs before they become targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobFilter {
    /// Optional region blobs must fall inside
    pub roi: Option<RegionOfInterest>,
    /// Accepted area range (min, max) in square pixels, inclusive
    pub area_range: (f64, f64),
    pub min_roundness: f64,
}

impl Default for BlobFilter {
    fn default() -> Self {
        Self {
            roi: None,
            area_range: (20.0, 5000.0),
            min_roundness: 0.5,
        }
    }
}

impl BlobFilter {
    pub fn in_region(&self, obs: &PixelObservation) -> bool {
        self.roi.map_or(true, |roi| roi.contains(obs.px, obs.py))
    }

    pub fn area_ok(&self, obs: &PixelObservation) -> bool {
        obs.area >= self.area_range.0 && obs.area <= self.area_range.1
    }

    pub fn roundness_ok(&self, obs: &PixelObservation) -> bool {
        obs.roundness >= self.min_roundness
    }

    /// Returns true if the observation passes every threshold.
    pub fn accepts(&self, obs: &PixelObservation) -> bool {
        self.in_region(obs) && self.area_ok(obs) && self.roundness_ok(obs)
    }
}
