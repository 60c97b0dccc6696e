//! Scripted collaborators for exercising the sequencer without hardware.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use shared::blob::{BlobFilter, PixelObservation};

use crate::{
    ActuatorAxis, ActuatorInterface, DigitalInput, DigitalOutput, HardwareError, HardwareResult,
    RangingInterface, VisionInterface,
};

/// Vision collaborator that replays a fixed list of frames.
///
/// Each frame is screened with the filter it is called with. Once the script
/// runs out, every capture returns an empty frame.
#[derive(Debug, Default)]
pub struct ScriptedVision {
    frames: VecDeque<HardwareResult<Vec<PixelObservation>>>,
    captures: usize,
}

impl ScriptedVision {
    pub fn new(frames: impl IntoIterator<Item = Vec<PixelObservation>>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
            captures: 0,
        }
    }

    /// Queue a capture failure after the scripted frames.
    pub fn push_error(&mut self, error: HardwareError) {
        self.frames.push_back(Err(error));
    }

    pub fn captures(&self) -> usize {
        self.captures
    }
}

impl VisionInterface for ScriptedVision {
    fn capture_blobs(&mut self, filter: &BlobFilter) -> HardwareResult<Vec<PixelObservation>> {
        self.captures += 1;
        match self.frames.pop_front() {
            Some(frame) => frame.map(|blobs| blobs.into_iter().filter(|b| filter.accepts(b)).collect()),
            None => Ok(Vec::new()),
        }
    }
}

/// Ranger that replays scripted samples, then repeats `steady` forever.
///
/// With no steady value an exhausted script reports a timeout.
#[derive(Debug, Default)]
pub struct ScriptedRanger {
    samples: VecDeque<HardwareResult<f64>>,
    steady: Option<f64>,
    calls: usize,
}

impl ScriptedRanger {
    pub fn steady(distance_cm: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            steady: Some(distance_cm),
            calls: 0,
        }
    }

    pub fn with_samples(
        samples: impl IntoIterator<Item = HardwareResult<f64>>,
        steady: Option<f64>,
    ) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            steady,
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl RangingInterface for ScriptedRanger {
    fn sample_distance(
        &mut self,
        timeout: Option<Duration>,
        cancel: Option<&AtomicBool>,
    ) -> HardwareResult<f64> {
        self.calls += 1;
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(HardwareError::Cancelled);
        }
        if let Some(sample) = self.samples.pop_front() {
            return sample;
        }
        self.steady.ok_or(HardwareError::Timeout {
            what: "scripted range sample",
            waited: timeout.unwrap_or_default(),
        })
    }
}

/// Digital input that replays levels, then holds `idle`.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    levels: VecDeque<bool>,
    idle: bool,
    reads: usize,
}

impl ScriptedInput {
    pub fn new(levels: impl IntoIterator<Item = bool>, idle: bool) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            idle,
            reads: 0,
        }
    }

    /// Input that always reads `level`.
    pub fn constant(level: bool) -> Self {
        Self {
            levels: VecDeque::new(),
            idle: level,
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl DigitalInput for ScriptedInput {
    fn read_level(&mut self) -> HardwareResult<bool> {
        self.reads += 1;
        Ok(self.levels.pop_front().unwrap_or(self.idle))
    }
}

/// Digital output that records every level written.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    history: Vec<bool>,
    fail_on_high: bool,
}

impl RecordingOutput {
    /// Output whose every attempt to go high fails with an I/O error.
    pub fn failing_on_high() -> Self {
        Self {
            history: Vec::new(),
            fail_on_high: true,
        }
    }

    pub fn history(&self) -> &[bool] {
        &self.history
    }

    /// Last level written, false if never written.
    pub fn level(&self) -> bool {
        self.history.last().copied().unwrap_or(false)
    }
}

impl DigitalOutput for RecordingOutput {
    fn set_level(&mut self, level: bool) -> HardwareResult<()> {
        if level && self.fail_on_high {
            return Err(HardwareError::Io("scripted output fault".to_string()));
        }
        self.history.push(level);
        Ok(())
    }
}

/// Actuator that records every command.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    commands: Vec<(ActuatorAxis, f64)>,
}

impl RecordingActuator {
    pub fn commands(&self) -> &[(ActuatorAxis, f64)] {
        &self.commands
    }

    /// Most recent angle sent to `axis`.
    pub fn last_angle(&self, axis: ActuatorAxis) -> Option<f64> {
        self.commands
            .iter()
            .rev()
            .find(|(a, _)| *a == axis)
            .map(|(_, deg)| *deg)
    }
}

impl ActuatorInterface for RecordingActuator {
    fn set_angle(&mut self, axis: ActuatorAxis, degrees: f64) -> HardwareResult<()> {
        self.commands.push((axis, degrees));
        Ok(())
    }
}
