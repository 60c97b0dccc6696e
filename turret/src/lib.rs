//! Laser turret target sequencer.
//!
//! Collects blob observations over several frames, averages them into target
//! estimates, orders those by distance to a reference marker and then walks the
//! list: wait for acknowledgement, range, aim, fire, advance.
//!
//! States: Idle -> Accumulating -> Ranked -> Dispatching -> Done, with Halted
//! reachable from any active state on a fatal error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use hardware::{wait_for_level, ActuatorAxis, HardwareError, LimitedActuator, VisionInterface};
use shared::blob::PixelObservation;
use shared::geometry::{compute_aim_angles, AimResult, GeometryError};
use shared::range_filter::RangeFilter;

pub mod callback;
pub mod clustering;
pub mod config;
pub mod error;
pub mod peripherals;
pub mod ranking;
pub mod selection;
pub mod state;

use crate::callback::{CallbackId, TurretCallback};
use crate::clustering::TargetAccumulator;

// Re-export commonly used types for external use
pub use crate::callback::TurretEvent;
pub use crate::clustering::{MatchingStrategy, Target};
pub use crate::config::{ConfigError, TurretConfig};
pub use crate::error::SequencerError;
pub use crate::peripherals::TurretPeripherals;
pub use crate::ranking::{RankedTarget, TieBreak};
pub use crate::state::{SequencerEvent, SequencerState};

/// What happened to one dispatched target.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Aimed { aim: AimResult, standoff_cm: f64 },
    Skipped(GeometryError),
}

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceSummary {
    pub dispatched: usize,
    pub skipped: usize,
}

/// Target sequencer state machine and control loop.
pub struct TargetSequencer {
    /// Current state
    state: SequencerState,
    config: TurretConfig,
    /// Present while accumulating
    accumulator: Option<TargetAccumulator>,
    /// Ordered targets (populated on entering Ranked)
    ranked: Vec<RankedTarget>,
    /// Standoff smoothing, owned by this control loop only
    range_filter: RangeFilter,
    dispatched: usize,
    skipped: usize,
    /// Registered callbacks
    callbacks: Arc<Mutex<HashMap<CallbackId, TurretCallback>>>,
    /// Next callback ID
    next_callback_id: Arc<Mutex<CallbackId>>,
    /// Set from another thread to abort blocking waits
    cancel: Arc<AtomicBool>,
}

impl TargetSequencer {
    /// Create a sequencer after validating `config`.
    pub fn new(config: TurretConfig) -> Result<Self, SequencerError> {
        config
            .validate()
            .map_err(|e| SequencerError::InvalidConfig(e.to_string()))?;
        let range_filter = RangeFilter::new(config.range_filter_capacity);
        Ok(Self {
            state: SequencerState::Idle,
            config,
            accumulator: None,
            ranked: Vec::new(),
            range_filter,
            dispatched: 0,
            skipped: 0,
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            next_callback_id: Arc::new(Mutex::new(0)),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn config(&self) -> &TurretConfig {
        &self.config
    }

    /// Targets in dispatch order.
    pub fn ranked_targets(&self) -> &[RankedTarget] {
        &self.ranked
    }

    pub fn range_filter(&self) -> &RangeFilter {
        &self.range_filter
    }

    pub fn summary(&self) -> SequenceSummary {
        SequenceSummary {
            dispatched: self.dispatched,
            skipped: self.skipped,
        }
    }

    /// Flag that aborts the run when set, including blocked acknowledgement
    /// and ranging waits.
    ///
    /// A flag raised before a run starts cancels that run. It is cleared once
    /// the run halts or completes, so the next run starts armed.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Register a callback for sequencer events
    pub fn register_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&TurretEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.lock().unwrap();
        let mut next_id = self.next_callback_id.lock().unwrap();

        let callback_id = *next_id;
        *next_id += 1;

        callbacks.insert(callback_id, Arc::new(callback));
        callback_id
    }

    /// Deregister a callback
    pub fn deregister_callback(&self, callback_id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.lock().unwrap();
        callbacks.remove(&callback_id).is_some()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    fn emit_event(&self, event: &TurretEvent) {
        let callbacks = self.callbacks.lock().unwrap();
        for callback in callbacks.values() {
            callback(event);
        }
    }

    fn handle_start(&mut self) -> SequencerState {
        log::info!(
            "Starting acquisition over {} frames",
            self.config.acquisition_frames
        );
        self.accumulator = Some(TargetAccumulator::new(
            self.config.matching,
            self.config.max_targets,
        ));
        self.ranked.clear();
        self.range_filter.reset();
        self.dispatched = 0;
        self.skipped = 0;
        SequencerState::Accumulating {
            frames_collected: 0,
        }
    }

    fn handle_accumulating_frame(
        &mut self,
        frames_collected: usize,
        blobs: &[PixelObservation],
    ) -> SequencerState {
        let frames = frames_collected + 1;
        let screened = selection::screen_blobs(
            blobs,
            &self.config.blob_filter,
            &self.config.mount.resolution,
        );

        let (matching, max_targets) = (self.config.matching, self.config.max_targets);
        let accumulator = self
            .accumulator
            .get_or_insert_with(|| TargetAccumulator::new(matching, max_targets));
        let stats = accumulator.add_frame(&screened);

        log::info!(
            "Accumulated frame {}/{}: {} of {} blobs kept ({} matched, {} new, {} dropped)",
            frames,
            self.config.acquisition_frames,
            screened.len(),
            blobs.len(),
            stats.matched,
            stats.opened,
            stats.dropped
        );

        if frames >= self.config.acquisition_frames {
            self.finish_accumulation();
            SequencerState::Ranked
        } else {
            SequencerState::Accumulating {
                frames_collected: frames,
            }
        }
    }

    fn finish_accumulation(&mut self) {
        let targets = self
            .accumulator
            .take()
            .map(|acc| acc.finalize(self.config.min_observations))
            .unwrap_or_default();

        self.ranked = ranking::rank_targets(
            &targets,
            self.config.reference_marker,
            self.config.tie_tolerance_px,
            self.config.tie_break,
        );

        log::info!("Acquisition complete with {} targets, entering Ranked", self.ranked.len());
        for (i, r) in self.ranked.iter().enumerate() {
            log::debug!(
                "  #{i}: ({:.1}, {:.1}) from {} frames, {:.1} px from reference",
                r.target.px,
                r.target.py,
                r.target.frame_count,
                r.distance
            );
        }

        self.emit_event(&TurretEvent::AcquisitionComplete {
            targets: self.ranked.iter().map(|r| r.target).collect(),
        });
    }

    /// Process an event and potentially transition states
    pub fn process_event(&mut self, event: SequencerEvent<'_>) -> Result<(), SequencerError> {
        use SequencerState::*;

        let new_state = match (&self.state, event) {
            (Idle | Done | Halted, SequencerEvent::Start) => self.handle_start(),

            (Accumulating { frames_collected }, SequencerEvent::Frame(blobs)) => {
                let frames_collected = *frames_collected;
                self.handle_accumulating_frame(frames_collected, blobs)
            }
            (Accumulating { .. }, SequencerEvent::Abort) => {
                log::info!("Aborting acquisition, returning to Idle");
                self.accumulator = None;
                Idle
            }

            (Ranked | Dispatching { .. }, SequencerEvent::Abort) => {
                log::warn!("Run aborted, entering Halted");
                self.emit_event(&TurretEvent::SequenceHalted {
                    reason: "aborted".to_string(),
                });
                Halted
            }

            (state, event) => {
                log::warn!("Invalid state transition: {} in {state:?}", event.name());
                return Err(SequencerError::InvalidState {
                    operation: event.name(),
                    state: state.clone(),
                });
            }
        };

        self.state = new_state;
        Ok(())
    }

    /// Feed one frame of blobs while accumulating.
    pub fn process_frame(&mut self, blobs: &[PixelObservation]) -> Result<(), SequencerError> {
        self.process_event(SequencerEvent::Frame(blobs))
    }

    /// Run accumulation to completion using `vision`, returning the ranked targets.
    pub fn acquire(
        &mut self,
        vision: &mut dyn VisionInterface,
    ) -> Result<&[RankedTarget], SequencerError> {
        if !matches!(self.state, SequencerState::Accumulating { .. }) {
            self.process_event(SequencerEvent::Start)?;
        }

        while matches!(self.state, SequencerState::Accumulating { .. }) {
            self.check_cancelled()?;
            let blobs = match vision.capture_blobs(&self.config.blob_filter) {
                Ok(blobs) => blobs,
                Err(e) => return Err(self.enter_halted(e.into())),
            };
            self.process_frame(&blobs)?;
        }

        Ok(&self.ranked)
    }

    fn check_cancelled(&self) -> Result<(), SequencerError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(SequencerError::Cancelled);
        }
        Ok(())
    }

    fn enter_halted(&mut self, reason: SequencerError) -> SequencerError {
        log::error!("Halting run: {reason}");
        self.state = SequencerState::Halted;
        self.accumulator = None;
        self.cancel.store(false, Ordering::Relaxed);
        self.emit_event(&TurretEvent::SequenceHalted {
            reason: reason.to_string(),
        });
        reason
    }

    fn halt(&mut self, peripherals: &mut TurretPeripherals<'_>, reason: SequencerError) -> SequencerError {
        for fault in peripherals.force_safe() {
            log::error!("Output fault while halting: {fault}");
        }
        if self.state == SequencerState::Halted {
            return reason;
        }
        self.enter_halted(reason)
    }

    /// Take one raw range sample, retrying timeouts and bad samples, and feed
    /// it to the range filter. Returns the filter output.
    fn sample_range(&mut self, peripherals: &mut TurretPeripherals<'_>) -> Result<f64, SequencerError> {
        let timeout = self.config.ranging_timeout();
        let attempts = self.config.ranging_retries + 1;
        let start = Instant::now();

        for attempt in 1..=attempts {
            self.check_cancelled()?;
            match peripherals
                .ranger
                .sample_distance(timeout, Some(self.cancel.as_ref()))
            {
                Ok(raw) if raw.is_finite() && raw > 0.0 => {
                    let smoothed = self.range_filter.ingest(raw);
                    log::debug!("Range sample {raw:.2} cm, filtered {smoothed:.2} cm");
                    return Ok(smoothed);
                }
                Ok(raw) => {
                    log::warn!("Range attempt {attempt}/{attempts}: discarding sample {raw}");
                }
                Err(e @ (HardwareError::Timeout { .. } | HardwareError::InvalidSample(_))) => {
                    log::warn!("Range attempt {attempt}/{attempts} failed: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SequencerError::SensorTimeout {
            what: "range sample",
            waited: start.elapsed(),
        })
    }

    /// Fill the range filter so the first standoff is not biased toward zero.
    pub fn prime_range_filter(
        &mut self,
        peripherals: &mut TurretPeripherals<'_>,
    ) -> Result<(), SequencerError> {
        let samples = self.config.range_warmup_samples;
        for _ in 0..samples {
            self.sample_range(peripherals)?;
        }
        if samples > 0 {
            log::info!(
                "Range filter primed with {samples} samples: {:.1} cm",
                self.range_filter.average()?
            );
        }
        Ok(())
    }

    fn wait_for_acknowledgement(
        &self,
        peripherals: &mut TurretPeripherals<'_>,
    ) -> Result<(), SequencerError> {
        peripherals.indicator.set_level(true)?;
        let waited = wait_for_level(
            &mut *peripherals.acknowledge,
            true,
            self.config.ack_poll_interval(),
            self.config.ack_timeout(),
            Some(self.cancel.as_ref()),
            "acknowledgement",
        );
        peripherals.indicator.set_level(false)?;
        let waited = waited?;
        log::debug!("Acknowledged after {waited:?}");
        Ok(())
    }

    fn aim_and_fire(
        &mut self,
        peripherals: &mut TurretPeripherals<'_>,
        index: usize,
    ) -> Result<DispatchOutcome, SequencerError> {
        self.check_cancelled()?;
        let ranked = self.ranked[index];
        let target = ranked.target;

        self.wait_for_acknowledgement(peripherals)?;
        self.sample_range(peripherals)?;
        let standoff_cm = self.range_filter.average()?;

        let aim = match compute_aim_angles(target.px, target.py, standoff_cm, &self.config.mount) {
            Ok(aim) => aim,
            Err(reason) => {
                log::warn!(
                    "Skipping target #{index} at ({:.1}, {:.1}): {reason}",
                    target.px,
                    target.py
                );
                self.skipped += 1;
                if let Some(buzzer) = peripherals.buzzer.as_deref_mut() {
                    buzzer.set_level(true)?;
                    std::thread::sleep(self.config.buzz_duration());
                    buzzer.set_level(false)?;
                }
                self.emit_event(&TurretEvent::TargetSkipped {
                    index,
                    target,
                    reason: reason.clone(),
                });
                return Ok(DispatchOutcome::Skipped(reason));
            }
        };

        let mut actuator = LimitedActuator::new(&mut *peripherals.actuator, self.config.servo_limits);
        let pan = actuator.move_clamped(ActuatorAxis::Pan, aim.pan_deg)?;
        let tilt = actuator.move_clamped(ActuatorAxis::Tilt, aim.tilt_deg)?;
        log::info!(
            "Target #{index} at ({:.1}, {:.1}), standoff {standoff_cm:.1} cm: {aim} (commanded pan {:.3}, tilt {:.3})",
            target.px,
            target.py,
            pan.degrees(),
            tilt.degrees()
        );

        std::thread::sleep(self.config.settle_delay());
        peripherals.laser.set_level(true)?;
        std::thread::sleep(self.config.laser_dwell());
        peripherals.laser.set_level(false)?;

        self.dispatched += 1;
        self.emit_event(&TurretEvent::TargetAimed {
            index,
            target,
            aim,
            standoff_cm,
        });
        Ok(DispatchOutcome::Aimed { aim, standoff_cm })
    }

    fn finish(&mut self) {
        log::info!(
            "Sequence complete: {} dispatched, {} skipped",
            self.dispatched,
            self.skipped
        );
        self.state = SequencerState::Done;
        self.cancel.store(false, Ordering::Relaxed);
        self.emit_event(&TurretEvent::SequenceComplete {
            dispatched: self.dispatched,
            skipped: self.skipped,
        });
    }

    fn dispatch_inner(
        &mut self,
        peripherals: &mut TurretPeripherals<'_>,
    ) -> Result<Option<DispatchOutcome>, SequencerError> {
        let index = match self.state {
            SequencerState::Ranked => {
                if !self.ranked.is_empty() {
                    self.prime_range_filter(peripherals)?;
                }
                0
            }
            SequencerState::Dispatching { index } => index,
            ref state => {
                return Err(SequencerError::InvalidState {
                    operation: "dispatch",
                    state: state.clone(),
                })
            }
        };

        if index >= self.ranked.len() {
            self.finish();
            return Ok(None);
        }

        self.state = SequencerState::Dispatching { index };
        let outcome = self.aim_and_fire(peripherals, index)?;

        if index + 1 >= self.ranked.len() {
            self.finish();
        } else {
            self.state = SequencerState::Dispatching { index: index + 1 };
        }
        Ok(Some(outcome))
    }

    /// Handle the next ranked target.
    ///
    /// Returns `None` once every target has been handled. Geometry failures
    /// skip the target; any other failure halts the run with laser and
    /// indicator forced off.
    pub fn dispatch_next(
        &mut self,
        peripherals: &mut TurretPeripherals<'_>,
    ) -> Result<Option<DispatchOutcome>, SequencerError> {
        match self.dispatch_inner(peripherals) {
            Ok(outcome) => Ok(outcome),
            Err(e @ SequencerError::InvalidState { .. }) => Err(e),
            Err(e) => Err(self.halt(peripherals, e)),
        }
    }

    /// Acquire, rank and dispatch every target.
    pub fn run(
        &mut self,
        peripherals: &mut TurretPeripherals<'_>,
    ) -> Result<SequenceSummary, SequencerError> {
        if let Err(e) = self.acquire(&mut *peripherals.vision) {
            return Err(self.halt(peripherals, e));
        }
        while self.dispatch_next(peripherals)?.is_some() {}
        Ok(self.summary())
    }
}
