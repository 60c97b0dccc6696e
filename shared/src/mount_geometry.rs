//! Per-unit mount calibration for the camera, laser and pan/tilt pivots.
//!
//! These constants are measured once for each physical turret and loaded at
//! startup. Nothing in the aiming path mutates them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::{GeometryError, Point3};

/// Sensor resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorResolution {
    pub width: u32,
    pub height: u32,
}

impl SensorResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel coordinate of the optical center
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Returns true if `(px, py)` lies in `[0, width) x [0, height)`.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= 0.0 && py >= 0.0 && px < self.width as f64 && py < self.height as f64
    }
}

impl Default for SensorResolution {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

/// Mount calibration constants.
///
/// Offsets are in centimeters, angles in degrees. `pan_pivot_offset` is
/// measured from the camera's optical center; `tilt_pivot_offset` is measured
/// from the pan pivot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountGeometry {
    /// Full horizontal field of view
    pub horizontal_fov_deg: f64,
    /// Full vertical field of view
    pub vertical_fov_deg: f64,
    pub resolution: SensorResolution,
    /// Angle between the optical axis and the reference plane (90 = looking straight down the plane normal)
    pub camera_tilt_deg: f64,
    /// Horizontal distance from the tilt axis to the laser emitter
    pub laser_axis_offset_cm: f64,
    pub pan_pivot_offset: Point3,
    pub tilt_pivot_offset: Point3,
}

impl Default for MountGeometry {
    /// Pi camera v2 optics at 1024x768 looking straight at the target plane.
    fn default() -> Self {
        Self {
            horizontal_fov_deg: 62.2,
            vertical_fov_deg: 48.8,
            resolution: SensorResolution::default(),
            camera_tilt_deg: 90.0,
            laser_axis_offset_cm: 1.42,
            pan_pivot_offset: Point3::ORIGIN,
            tilt_pivot_offset: Point3::ORIGIN,
        }
    }
}

impl MountGeometry {
    /// Calibration with no pivot or laser offsets, useful for boresight checks.
    pub fn coaxial() -> Self {
        Self {
            laser_axis_offset_cm: 0.0,
            ..Self::default()
        }
    }

    /// Reject calibrations that cannot produce a finite projection.
    pub fn validate(&self) -> Result<(), GeometryError> {
        for (name, fov) in [
            ("horizontal_fov_deg", self.horizontal_fov_deg),
            ("vertical_fov_deg", self.vertical_fov_deg),
        ] {
            if !fov.is_finite() || fov <= 0.0 || fov >= 180.0 {
                return Err(GeometryError::InvalidMount(format!(
                    "{name} must be in (0, 180), got {fov}"
                )));
            }
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(GeometryError::InvalidMount(format!(
                "resolution must be non-zero, got {}x{}",
                self.resolution.width, self.resolution.height
            )));
        }

        if !self.camera_tilt_deg.is_finite() {
            return Err(GeometryError::InvalidMount(
                "camera_tilt_deg must be finite".to_string(),
            ));
        }

        if !self.laser_axis_offset_cm.is_finite() || self.laser_axis_offset_cm < 0.0 {
            return Err(GeometryError::InvalidMount(format!(
                "laser_axis_offset_cm must be finite and non-negative, got {}",
                self.laser_axis_offset_cm
            )));
        }

        if !self.pan_pivot_offset.is_finite() || !self.tilt_pivot_offset.is_finite() {
            return Err(GeometryError::InvalidMount(
                "pivot offsets must be finite".to_string(),
            ));
        }

        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        let mount: Self = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        mount
            .validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        log::debug!("Loaded mount geometry from {}", path.display());
        Ok(mount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_valid() {
        let mount = MountGeometry::default();
        assert!(mount.validate().is_ok());
        assert_eq!(mount.resolution.center(), (512.0, 384.0));
    }

    #[test]
    fn test_resolution_contains() {
        let res = SensorResolution::new(1024, 768);
        assert!(res.contains(0.0, 0.0));
        assert!(res.contains(1023.9, 767.9));
        assert!(!res.contains(1024.0, 10.0));
        assert!(!res.contains(10.0, -0.1));
    }

    #[test]
    fn test_validate_rejects_bad_fov() {
        let mount = MountGeometry {
            vertical_fov_deg: 180.0,
            ..MountGeometry::default()
        };
        assert!(matches!(
            mount.validate(),
            Err(GeometryError::InvalidMount(_))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_laser_offset() {
        let mount = MountGeometry {
            laser_axis_offset_cm: -1.0,
            ..MountGeometry::default()
        };
        assert!(mount.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mount.json");

        let mount = MountGeometry {
            camera_tilt_deg: 75.0,
            pan_pivot_offset: Point3::new(0.0, 3.5, -2.0),
            tilt_pivot_offset: Point3::new(0.0, 0.0, 4.25),
            ..MountGeometry::default()
        };
        mount.save_to_file(&path).unwrap();

        let loaded = MountGeometry::load_from_file(&path).unwrap();
        assert_eq!(loaded, mount);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mount.json");

        let mount = MountGeometry {
            resolution: SensorResolution::new(0, 768),
            ..MountGeometry::default()
        };
        mount.save_to_file(&path).unwrap();

        let err = MountGeometry::load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
