//! Aiming geometry: pixel ray projection, laser parallax correction and the
//! pivot transform chain that turns a camera pixel into pan/tilt angles.
//!
//! All functions here are pure. Errors are returned per computation and never
//! leave partially updated state behind.

pub mod aim;
pub mod parallax;
pub mod point;
pub mod projection;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use aim::compute_aim_angles;
pub use parallax::{exit_point_on_branch, solve_laser_exit, ExitBranch};
pub use point::{Point3, RotationAxis};
pub use projection::{project_pixel, unproject_point};

/// Threshold below which a cosine is treated as zero.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// Errors produced by the aiming geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid rotation axis index {index} (expected 0, 1 or 2)")]
    InvalidAxis {
        /// Index that was supplied
        index: usize,
    },

    #[error("degenerate projection: {term} = {value:e}")]
    DegenerateProjection {
        /// Name of the vanishing term
        term: &'static str,
        /// Value of the term when the guard tripped
        value: f64,
    },

    #[error("point is outside the laser's reachable geometry (discriminant {discriminant:e})")]
    UnreachableGeometry {
        /// Quadratic discriminant of the tangency solve
        discriminant: f64,
    },

    #[error("singular aim: {0}")]
    SingularAim(&'static str),

    #[error("pixel ({px}, {py}) outside {width}x{height} frame")]
    PixelOutOfFrame {
        px: f64,
        py: f64,
        width: u32,
        height: u32,
    },

    #[error("standoff distance must be finite and positive, got {0}")]
    InvalidStandoff(f64),

    #[error("invalid mount geometry: {0}")]
    InvalidMount(String),
}

/// Pan/tilt command for one target, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimResult {
    pub pan_deg: f64,
    pub tilt_deg: f64,
}

impl std::fmt::Display for AimResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pan {:.3}° tilt {:.3}°", self.pan_deg, self.tilt_deg)
    }
}
