//! Laser exit point correction.
//!
//! The laser emitter sits on a circle of radius `h` around the tilt axis and
//! fires perpendicular to its lever arm. For the beam to pass through a target
//! at `(x, z)` (in the plane normal to the tilt axis) the emitter must be at a
//! point `(a, b)` on that circle whose tangent line goes through the target:
//!
//! ```text
//! a*x + b*z = h^2,    a^2 + b^2 = h^2
//! ```
//!
//! Eliminating `b` gives a quadratic in `a`:
//!
//! ```text
//! (x^2 + z^2) a^2 - 2 x h^2 a + (h^4 - h^2 z^2) = 0
//! D = 4 (x^2 h^4 - (x^2 + z^2)(h^4 - z^2 h^2))
//! ```
//!
//! Both roots are valid tangents and mirror each other across the line from
//! the axis to the target. Which one the laser actually uses depends on which
//! side of the axis the target lies, so the root is chosen from the sign of `z`.

use serde::{Deserialize, Serialize};

use super::{GeometryError, Point3};

/// Root of the tangency quadratic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitBranch {
    /// `(2 x h^2 - sqrt(D)) / (2 (x^2 + z^2))`
    NegativeRoot,
    /// `(2 x h^2 + sqrt(D)) / (2 (x^2 + z^2))`
    PositiveRoot,
}

impl ExitBranch {
    /// Branch the laser uses for a target at depth `z`.
    ///
    /// `z > 0` selects the negative root; `z <= 0` selects the positive root.
    pub fn for_depth(z: f64) -> Self {
        if z > 0.0 {
            ExitBranch::NegativeRoot
        } else {
            ExitBranch::PositiveRoot
        }
    }

    fn sign(self) -> f64 {
        match self {
            ExitBranch::NegativeRoot => -1.0,
            ExitBranch::PositiveRoot => 1.0,
        }
    }
}

/// Discriminant of the tangency quadratic, in the expanded form.
pub fn tangency_discriminant(x: f64, z: f64, h: f64) -> f64 {
    let h2 = h * h;
    let h4 = h2 * h2;
    4.0 * (x * x * h4 - (x * x + z * z) * (h4 - z * z * h2))
}

/// Laser exit point on an explicitly chosen branch.
///
/// The returned point has the input's `y` unchanged.
pub fn exit_point_on_branch(
    point: Point3,
    laser_axis_offset: f64,
    branch: ExitBranch,
) -> Result<Point3, GeometryError> {
    let h = laser_axis_offset;
    if !h.is_finite() || h < 0.0 {
        return Err(GeometryError::InvalidMount(format!(
            "laser axis offset must be finite and non-negative, got {h}"
        )));
    }
    if h == 0.0 {
        return Ok(Point3::new(0.0, point.y, 0.0));
    }

    let (x, z) = (point.x, point.z);
    let h2 = h * h;
    let n2 = x * x + z * z;

    let discriminant = tangency_discriminant(x, z, h);
    // Also covers z == 0, where D collapses to zero even inside the circle
    if discriminant < 0.0 || n2 < h2 || n2 == 0.0 {
        return Err(GeometryError::UnreachableGeometry { discriminant });
    }

    let sigma = branch.sign();
    let depth_sign = if z > 0.0 { 1.0 } else { -1.0 };
    // sqrt(D) = 2 |z| h s; rewriting both coordinates in s avoids dividing by z
    let s = (n2 - h2).max(0.0).sqrt();

    let a = (x * h2 + sigma * z.abs() * h * s) / n2;
    let b = (z * h2 - sigma * depth_sign * x * h * s) / n2;

    Ok(Point3::new(a, point.y, b))
}

/// Laser exit point for a candidate aim point, with the branch chosen by depth.
pub fn solve_laser_exit(point: Point3, laser_axis_offset: f64) -> Result<Point3, GeometryError> {
    exit_point_on_branch(point, laser_axis_offset, ExitBranch::for_depth(point.z))
}
