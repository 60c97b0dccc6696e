//! Minimal 3D point algebra with axis rotations.

use std::ops::{Add, Neg, Sub};

use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::GeometryError;

/// Principal rotation axis.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

impl RotationAxis {
    /// Map a numeric axis index (0 = X, 1 = Y, 2 = Z).
    pub fn from_index(index: usize) -> Result<Self, GeometryError> {
        match index {
            0 => Ok(RotationAxis::X),
            1 => Ok(RotationAxis::Y),
            2 => Ok(RotationAxis::Z),
            _ => Err(GeometryError::InvalidAxis { index }),
        }
    }

    fn unit_vector(self) -> Unit<Vector3<f64>> {
        match self {
            RotationAxis::X => Vector3::x_axis(),
            RotationAxis::Y => Vector3::y_axis(),
            RotationAxis::Z => Vector3::z_axis(),
        }
    }
}

impl TryFrom<usize> for RotationAxis {
    type Error = GeometryError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index)
    }
}

/// A point (or displacement) in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean length
    pub fn norm(self) -> f64 {
        self.to_vector().norm()
    }

    /// Length of the projection onto the XY plane
    pub fn horizontal_norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Rotate about a principal axis by `angle_deg` degrees.
    ///
    /// Uses the right-handed rotation matrix for the axis, so a positive angle
    /// about Z takes +X toward +Y.
    pub fn rotated(self, axis: RotationAxis, angle_deg: f64) -> Self {
        let rotation = Rotation3::from_axis_angle(&axis.unit_vector(), angle_deg.to_radians());
        Self::from_vector(&(rotation * self.to_vector()))
    }

    /// Rotate about an axis given by numeric index.
    ///
    /// Fails with [`GeometryError::InvalidAxis`] for indexes outside 0..=2; the
    /// receiver is never modified.
    pub fn rotated_about_index(self, index: usize, angle_deg: f64) -> Result<Self, GeometryError> {
        let axis = RotationAxis::from_index(index)?;
        Ok(self.rotated(axis, angle_deg))
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Point3 {
    type Output = Point3;

    fn neg(self) -> Point3 {
        Point3::new(-self.x, -self.y, -self.z)
    }
}
