//! Pixel to camera-space ray projection and its inverse.
//!
//! The boresight is +X of the camera frame, with +Z up in the image. A pixel is
//! first recentered on the optical axis, then mapped to a polar angle `theta`
//! (measured from +Z, so boresight is 90°) and an azimuth `phi` through the
//! tangent of the half field of view. The standoff to the reference plane is
//! converted into a slant range along that ray, and the resulting point is
//! rotated about Y into the gimbal base frame.

use std::f64::consts::FRAC_PI_2;

use super::{GeometryError, Point3, RotationAxis, DEGENERATE_EPSILON};
use crate::mount_geometry::MountGeometry;

/// Rotation about Y that takes camera space into gimbal-base space.
fn base_rotation_deg(mount: &MountGeometry) -> f64 {
    -(90.0 - mount.camera_tilt_deg)
}

/// Project a pixel at a known standoff into a 3D point in gimbal-base space.
///
/// Fails with [`GeometryError::PixelOutOfFrame`] if the pixel lies outside the
/// sensor, [`GeometryError::InvalidStandoff`] for a non-positive or non-finite
/// standoff, and [`GeometryError::DegenerateProjection`] when the ray runs
/// parallel to the reference plane.
pub fn project_pixel(
    px: f64,
    py: f64,
    standoff_cm: f64,
    mount: &MountGeometry,
) -> Result<Point3, GeometryError> {
    let res = mount.resolution;
    if !res.contains(px, py) {
        return Err(GeometryError::PixelOutOfFrame {
            px,
            py,
            width: res.width,
            height: res.height,
        });
    }
    if !standoff_cm.is_finite() || standoff_cm <= 0.0 {
        return Err(GeometryError::InvalidStandoff(standoff_cm));
    }

    let width = res.width as f64;
    let height = res.height as f64;

    // Recenter on the optical axis, flipping both image axes
    let cx = -px + width / 2.0;
    let cy = -py + height / 2.0;

    let half_vfov_tan = (mount.vertical_fov_deg.to_radians() / 2.0).tan();
    let half_hfov_tan = (mount.horizontal_fov_deg.to_radians() / 2.0).tan();

    let theta = FRAC_PI_2 - ((2.0 * cy / height) * half_vfov_tan).atan();
    let phi = ((2.0 * cx / width) * half_hfov_tan).atan();

    let plane_cos = (180.0 - (theta.to_degrees() + mount.camera_tilt_deg))
        .to_radians()
        .cos();
    if plane_cos.abs() < DEGENERATE_EPSILON {
        return Err(GeometryError::DegenerateProjection {
            term: "cos(180 - (theta + camera_tilt))",
            value: plane_cos,
        });
    }

    let phi_cos = phi.cos();
    if phi_cos.abs() < DEGENERATE_EPSILON {
        return Err(GeometryError::DegenerateProjection {
            term: "cos(phi)",
            value: phi_cos,
        });
    }

    let range = standoff_cm / plane_cos / phi_cos;

    let camera_point = Point3::new(
        range * theta.sin() * phi.cos(),
        range * theta.sin() * phi.sin(),
        range * theta.cos(),
    );

    Ok(camera_point.rotated(RotationAxis::Y, base_rotation_deg(mount)))
}

/// Map a gimbal-base point back to the pixel whose ray passes through it.
///
/// Inverts the direction part of [`project_pixel`]; the range along the ray is
/// discarded. The returned pixel is not checked against the frame bounds.
pub fn unproject_point(point: Point3, mount: &MountGeometry) -> Result<(f64, f64), GeometryError> {
    let range = point.norm();
    if range < DEGENERATE_EPSILON || !range.is_finite() {
        return Err(GeometryError::DegenerateProjection {
            term: "|point|",
            value: range,
        });
    }

    let camera_point = point.rotated(RotationAxis::Y, -base_rotation_deg(mount));

    let theta = (camera_point.z / range).clamp(-1.0, 1.0).acos();
    let phi = camera_point.y.atan2(camera_point.x);

    let sin_theta = theta.sin();
    if sin_theta < DEGENERATE_EPSILON || phi.cos() < DEGENERATE_EPSILON {
        return Err(GeometryError::DegenerateProjection {
            term: "sin(theta) cos(phi)",
            value: sin_theta * phi.cos(),
        });
    }

    let width = mount.resolution.width as f64;
    let height = mount.resolution.height as f64;
    let half_vfov_tan = (mount.vertical_fov_deg.to_radians() / 2.0).tan();
    let half_hfov_tan = (mount.horizontal_fov_deg.to_radians() / 2.0).tan();

    let cy = (FRAC_PI_2 - theta).tan() * height / (2.0 * half_vfov_tan);
    let cx = phi.tan() * width / (2.0 * half_hfov_tan);

    Ok((width / 2.0 - cx, height / 2.0 - cy))
}
