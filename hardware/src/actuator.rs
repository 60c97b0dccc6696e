//! Travel limits for the pan/tilt servos.

use serde::{Deserialize, Serialize};

use crate::{ActuatorAxis, ActuatorInterface, HardwareResult};

/// Result of a clamped move operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveResult {
    /// Angle was within limits, moved as requested.
    Ok { degrees: f64 },
    /// Angle was clamped to travel limits.
    Clamped { requested: f64, actual: f64 },
}

impl MoveResult {
    /// Angle that was actually commanded.
    pub fn degrees(&self) -> f64 {
        match self {
            MoveResult::Ok { degrees } => *degrees,
            MoveResult::Clamped { actual, .. } => *actual,
        }
    }

    pub fn was_clamped(&self) -> bool {
        matches!(self, MoveResult::Clamped { .. })
    }
}

/// Mechanical travel of each axis as (min, max) degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoLimits {
    pub pan: (f64, f64),
    pub tilt: (f64, f64),
}

impl Default for ServoLimits {
    fn default() -> Self {
        Self {
            pan: (-90.0, 90.0),
            tilt: (-90.0, 90.0),
        }
    }
}

impl ServoLimits {
    pub fn range(&self, axis: ActuatorAxis) -> (f64, f64) {
        match axis {
            ActuatorAxis::Pan => self.pan,
            ActuatorAxis::Tilt => self.tilt,
        }
    }

    /// Returns an error message if any range is empty or non-finite.
    pub fn validate(&self) -> Result<(), String> {
        for (name, (min, max)) in [("pan", self.pan), ("tilt", self.tilt)] {
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(format!("{name} limits must satisfy min < max, got ({min}, {max})"));
            }
        }
        Ok(())
    }
}

/// Actuator wrapper that clamps every command to [`ServoLimits`].
pub struct LimitedActuator<A: ActuatorInterface> {
    inner: A,
    limits: ServoLimits,
}

impl<A: ActuatorInterface> LimitedActuator<A> {
    pub fn new(inner: A, limits: ServoLimits) -> Self {
        Self { inner, limits }
    }

    /// Move one axis, clamping to travel limits.
    pub fn move_clamped(&mut self, axis: ActuatorAxis, degrees: f64) -> HardwareResult<MoveResult> {
        let (min, max) = self.limits.range(axis);
        let actual = degrees.clamp(min, max);
        self.inner.set_angle(axis, actual)?;

        if actual != degrees {
            tracing::warn!("{axis} command {degrees:.2}° clamped to {actual:.2}°");
            Ok(MoveResult::Clamped {
                requested: degrees,
                actual,
            })
        } else {
            Ok(MoveResult::Ok { degrees })
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: ActuatorInterface> ActuatorInterface for LimitedActuator<A> {
    fn set_angle(&mut self, axis: ActuatorAxis, degrees: f64) -> HardwareResult<()> {
        self.move_clamped(axis, degrees).map(|_| ())
    }
}
