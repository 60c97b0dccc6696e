//! Common utilities for turret sequencer tests

#![allow(dead_code)]

use hardware::mock::{RecordingActuator, RecordingOutput, ScriptedInput, ScriptedRanger, ScriptedVision};
use shared::blob::PixelObservation;
use turret::{TurretConfig, TurretPeripherals};

/// Config with every delay collapsed so runs finish immediately.
pub fn fast_config(frames: usize) -> TurretConfig {
    TurretConfig {
        acquisition_frames: frames,
        reference_marker: (512.0, 384.0),
        ack_poll_interval_ms: 1,
        settle_delay_ms: 0,
        laser_dwell_ms: 0,
        buzz_ms: 0,
        ranging_timeout_ms: Some(5),
        ..TurretConfig::default()
    }
}

/// A well-formed blob at the given pixel.
pub fn blob(px: f64, py: f64) -> PixelObservation {
    PixelObservation::new(px, py, 150.0, 0.9)
}

/// The same blobs repeated for `frames` frames, with a small alternating jitter.
pub fn repeated_frames(positions: &[(f64, f64)], frames: usize) -> Vec<Vec<PixelObservation>> {
    (0..frames)
        .map(|i| {
            let jitter = if i % 2 == 0 { 0.5 } else { -0.5 };
            positions
                .iter()
                .map(|&(px, py)| blob(px + jitter, py))
                .collect()
        })
        .collect()
}

/// Mock collaborators for one run.
pub struct Rig {
    pub vision: ScriptedVision,
    pub ranger: ScriptedRanger,
    pub acknowledge: ScriptedInput,
    pub actuator: RecordingActuator,
    pub indicator: RecordingOutput,
    pub laser: RecordingOutput,
    pub buzzer: RecordingOutput,
}

impl Rig {
    /// Rig that sees `frames`, ranges a steady 100 cm and is always acknowledged.
    pub fn new(frames: Vec<Vec<PixelObservation>>) -> Self {
        Self {
            vision: ScriptedVision::new(frames),
            ranger: ScriptedRanger::steady(100.0),
            acknowledge: ScriptedInput::constant(true),
            actuator: RecordingActuator::default(),
            indicator: RecordingOutput::default(),
            laser: RecordingOutput::default(),
            buzzer: RecordingOutput::default(),
        }
    }

    pub fn peripherals(&mut self) -> TurretPeripherals<'_> {
        TurretPeripherals {
            vision: &mut self.vision,
            ranger: &mut self.ranger,
            acknowledge: &mut self.acknowledge,
            actuator: &mut self.actuator,
            indicator: &mut self.indicator,
            laser: &mut self.laser,
            buzzer: Some(&mut self.buzzer),
        }
    }

    /// Number of times the laser was switched on.
    pub fn laser_pulses(&self) -> usize {
        self.laser.history().iter().filter(|level| **level).count()
    }
}
