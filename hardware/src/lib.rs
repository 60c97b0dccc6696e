//! Hardware collaborators for the laser turret.
//!
//! The sequencer only sees the traits defined here. Concrete backends drive
//! Linux character-device GPIO ([`gpio`]), sysfs PWM servo channels ([`pwm`])
//! and an ultrasonic echo ranger ([`ranging`]). [`mock`] provides scripted
//! stand-ins for tests.

pub mod actuator;
pub mod gpio;
pub mod mock;
pub mod pwm;
pub mod ranging;
pub mod wait;

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::blob::{BlobFilter, PixelObservation};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

pub use actuator::{LimitedActuator, MoveResult, ServoLimits};
pub use wait::wait_for_level;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        /// What the wait was for
        what: &'static str,
        waited: Duration,
    },

    #[error("wait cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid sample: {0}")]
    InvalidSample(f64),
}

impl From<std::io::Error> for HardwareError {
    fn from(e: std::io::Error) -> Self {
        HardwareError::Io(e.to_string())
    }
}

pub type HardwareResult<T> = Result<T, HardwareError>;

/// The two steering axes of the gimbal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ActuatorAxis {
    Pan,
    Tilt,
}

/// Camera plus blob detector.
pub trait VisionInterface {
    /// Capture one frame and return the blobs passing `filter`.
    fn capture_blobs(&mut self, filter: &BlobFilter) -> HardwareResult<Vec<PixelObservation>>;
}

/// Distance sensor.
pub trait RangingInterface {
    /// Take one raw distance sample in centimeters.
    ///
    /// A `timeout` of `None` blocks until the sensor answers or `cancel` is set.
    fn sample_distance(
        &mut self,
        timeout: Option<Duration>,
        cancel: Option<&AtomicBool>,
    ) -> HardwareResult<f64>;
}

pub trait DigitalInput {
    fn read_level(&mut self) -> HardwareResult<bool>;
}

pub trait DigitalOutput {
    fn set_level(&mut self, level: bool) -> HardwareResult<()>;
}

/// Two-axis angle actuator.
pub trait ActuatorInterface {
    fn set_angle(&mut self, axis: ActuatorAxis, degrees: f64) -> HardwareResult<()>;
}

impl<A: ActuatorInterface + ?Sized> ActuatorInterface for &mut A {
    fn set_angle(&mut self, axis: ActuatorAxis, degrees: f64) -> HardwareResult<()> {
        (**self).set_angle(axis, degrees)
    }
}
