//! Pivot transform chain from pixel to pan/tilt command.

use super::{project_pixel, solve_laser_exit, AimResult, GeometryError};
use crate::mount_geometry::MountGeometry;

/// Below this horizontal distance a point is treated as lying on the pan axis.
const PAN_AXIS_EPSILON: f64 = 1e-9;

/// Convert a pixel and standoff into the pan/tilt angles that put the laser on
/// the target.
///
/// The chain is:
/// 1. project the pixel into gimbal-base space,
/// 2. move the origin to the pan pivot and take the pan angle from `atan2(y, x)`,
/// 3. move the origin to the tilt pivot,
/// 4. move the origin to the laser exit point found by the parallax solve,
/// 5. take the tilt from the elevation of what remains and fold it into ±90°.
///
/// Pure: the same inputs always give the same output.
pub fn compute_aim_angles(
    px: f64,
    py: f64,
    standoff_cm: f64,
    mount: &MountGeometry,
) -> Result<AimResult, GeometryError> {
    let mut point = project_pixel(px, py, standoff_cm, mount)?;

    point = point - mount.pan_pivot_offset;
    if point.x.abs() < PAN_AXIS_EPSILON && point.y.abs() < PAN_AXIS_EPSILON {
        return Err(GeometryError::SingularAim("target lies on the pan axis"));
    }
    let phi = point.y.atan2(point.x).to_degrees();

    point = point - mount.tilt_pivot_offset;

    let exit = solve_laser_exit(point, mount.laser_axis_offset_cm)?;
    point = point - exit;

    let rho = point.horizontal_norm();
    // Exact comparison: near-zero depth is the normal boresight case
    if point.z == 0.0 {
        return Err(GeometryError::SingularAim(
            "target lies in the laser exit plane",
        ));
    }
    let theta = (rho / point.z).atan().to_degrees();
    let tilt = if theta < 0.0 {
        -90.0 - theta
    } else {
        90.0 - theta
    };

    log::trace!("Pixel ({px:.1}, {py:.1}) @ {standoff_cm:.1} cm -> pan {phi:.3}, tilt {tilt:.3}");

    Ok(AimResult {
        pan_deg: -phi,
        tilt_deg: tilt,
    })
}
