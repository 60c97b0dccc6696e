use std::time::Duration;

use hardware::HardwareError;
use shared::range_filter::RangeFilterEmpty;
use thiserror::Error;

use crate::state::SequencerState;

/// Errors produced by the target sequencer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequencerError {
    /// A sensor did not answer in time; no safe default exists.
    #[error("sensor timeout: {what} after {waited:?}")]
    SensorTimeout {
        /// What was being waited for.
        what: &'static str,
        /// How long the wait ran.
        waited: Duration,
    },

    /// The run was cancelled through the cancel handle.
    #[error("sequence cancelled")]
    Cancelled,

    /// Requested operation is not valid in the current state.
    #[error("{operation} is not valid in state {state:?}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the sequencer was in.
        state: SequencerState,
    },

    /// Range filter read before any sample was ingested.
    #[error(transparent)]
    RangeFilterEmpty(#[from] RangeFilterEmpty),

    /// Any other collaborator failure.
    #[error("hardware fault: {0}")]
    Hardware(String),

    /// Configuration validation failure.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<HardwareError> for SequencerError {
    fn from(e: HardwareError) -> Self {
        match e {
            HardwareError::Timeout { what, waited } => SequencerError::SensorTimeout { what, waited },
            HardwareError::Cancelled => SequencerError::Cancelled,
            other => SequencerError::Hardware(other.to_string()),
        }
    }
}
