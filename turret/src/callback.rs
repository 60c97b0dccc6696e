use std::sync::Arc;

use shared::geometry::{AimResult, GeometryError};

use crate::clustering::Target;

/// Events emitted for external callbacks
#[derive(Debug, Clone)]
pub enum TurretEvent {
    /// Accumulation finished and targets were ranked
    AcquisitionComplete { targets: Vec<Target> },
    /// A target was aimed at and fired on
    TargetAimed {
        index: usize,
        target: Target,
        aim: AimResult,
        standoff_cm: f64,
    },
    /// A target could not be aimed at and was passed over
    TargetSkipped {
        index: usize,
        target: Target,
        reason: GeometryError,
    },
    /// The run stopped on a fatal error
    SequenceHalted { reason: String },
    /// All targets handled
    SequenceComplete { dispatched: usize, skipped: usize },
}

/// Callback ID for registration/deregistration
pub type CallbackId = u64;

/// Callback function type
pub type TurretCallback = Arc<dyn Fn(&TurretEvent) + Send + Sync>;
