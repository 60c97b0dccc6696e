use serde::{Deserialize, Serialize};
use shared::blob::PixelObservation;

/// Target sequencer states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequencerState {
    /// Waiting for a start request
    Idle,
    /// Collecting blob observations across frames
    Accumulating { frames_collected: usize },
    /// Targets averaged and ordered, ready to dispatch
    Ranked,
    /// Aiming at the target with this index in the ranked list
    Dispatching { index: usize },
    /// Every ranked target has been dispatched or skipped
    Done,
    /// Run stopped on a fatal error; laser and indicator forced off
    Halted,
}

impl SequencerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SequencerState::Done | SequencerState::Halted)
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum SequencerEvent<'a> {
    /// Begin a new acquisition
    Start,
    /// Blobs reported for one frame
    Frame(&'a [PixelObservation]),
    /// Stop the current run
    Abort,
}

impl SequencerEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            SequencerEvent::Start => "Start",
            SequencerEvent::Frame(_) => "Frame",
            SequencerEvent::Abort => "Abort",
        }
    }
}
