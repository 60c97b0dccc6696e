//! Full acquire/rank/dispatch runs against scripted hardware

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use common::{fast_config, repeated_frames, Rig};
use hardware::mock::{RecordingOutput, ScriptedInput, ScriptedRanger};
use hardware::ranging::EchoRanger;
use hardware::{ActuatorAxis, HardwareError};
use shared::geometry::{GeometryError, Point3};
use shared::mount_geometry::MountGeometry;
use turret::{
    DispatchOutcome, SequenceSummary, SequencerError, SequencerState, TargetSequencer,
    TurretConfig, TurretEvent, TurretPeripherals,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_full_run_aims_every_target() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(600.0, 384.0), (512.0, 384.0)], 3));
    let mut seq = TargetSequencer::new(fast_config(3)).unwrap();

    let summary = seq.run(&mut rig.peripherals()).unwrap();

    assert_eq!(
        summary,
        SequenceSummary {
            dispatched: 2,
            skipped: 0
        }
    );
    assert_eq!(seq.state(), &SequencerState::Done);
    assert_eq!(rig.vision.captures(), 3);
    assert_eq!(rig.laser_pulses(), 2);
    assert!(!rig.laser.level());
    assert!(!rig.indicator.level());

    // Center target is nearest the reference and goes first
    let commands = rig.actuator.commands();
    assert_eq!(commands.len(), 4);
    assert_eq!(commands[0].0, ActuatorAxis::Pan);
    assert_eq!(commands[1].0, ActuatorAxis::Tilt);
    assert_abs_diff_eq!(commands[0].1, 0.0, epsilon = 0.1);
    assert_abs_diff_eq!(
        commands[1].1,
        -(1.42f64 / 100.0).asin().to_degrees(),
        epsilon = 0.05
    );
    // Right of center pans positive
    assert!(commands[2].1 > 0.0);
}

#[test]
fn test_range_filter_primed_before_first_target() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 2));
    let config = fast_config(2);
    let warmup = config.range_warmup_samples;
    let mut seq = TargetSequencer::new(config).unwrap();

    let aimed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&aimed);
    seq.register_callback(move |event| {
        if let TurretEvent::TargetAimed { standoff_cm, .. } = event {
            sink.lock().unwrap().push(*standoff_cm);
        }
    });

    seq.run(&mut rig.peripherals()).unwrap();

    assert_eq!(rig.ranger.calls(), warmup + 1);
    assert!(seq.range_filter().is_primed());
    // A full filter of 100 cm samples averages to exactly 100 cm
    assert_eq!(*aimed.lock().unwrap(), vec![100.0]);
}

#[test]
fn test_unprimed_filter_is_biased_low() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 100.0)], 1));
    let config = TurretConfig {
        range_warmup_samples: 0,
        ..fast_config(1)
    };
    let capacity = config.range_filter_capacity as f64;
    let mut seq = TargetSequencer::new(config).unwrap();

    let mut outcomes = Vec::new();
    let mut peripherals = rig.peripherals();
    seq.acquire(&mut *peripherals.vision).unwrap();
    while let Some(outcome) = seq.dispatch_next(&mut peripherals).unwrap() {
        outcomes.push(outcome);
    }

    match &outcomes[..] {
        [DispatchOutcome::Aimed { standoff_cm, .. }] => {
            assert_abs_diff_eq!(*standoff_cm, 100.0 / capacity, epsilon = 1e-9)
        }
        other => panic!("unexpected outcomes {other:?}"),
    }
}

#[test]
fn test_unreachable_target_is_skipped() {
    init_logging();

    // Tilt pivot half a centimeter short of the plane: the boresight target
    // falls inside the laser circle, the one high in the frame does not
    let config = TurretConfig {
        mount: MountGeometry {
            tilt_pivot_offset: Point3::new(99.5, 0.0, 0.0),
            ..MountGeometry::default()
        },
        ..fast_config(2)
    };
    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0), (512.0, 100.0)], 2));
    let mut seq = TargetSequencer::new(config).unwrap();

    let skipped = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&skipped);
    seq.register_callback(move |event| {
        if let TurretEvent::TargetSkipped { index, reason, .. } = event {
            sink.lock().unwrap().push((*index, reason.clone()));
        }
    });

    let summary = seq.run(&mut rig.peripherals()).unwrap();

    assert_eq!(
        summary,
        SequenceSummary {
            dispatched: 1,
            skipped: 1
        }
    );
    assert_eq!(seq.state(), &SequencerState::Done);
    assert_eq!(rig.laser_pulses(), 1);
    assert_eq!(rig.actuator.commands().len(), 2);
    assert_eq!(rig.buzzer.history(), &[true, false]);

    let skipped = skipped.lock().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, 0);
    assert!(matches!(
        skipped[0].1,
        GeometryError::UnreachableGeometry { .. }
    ));
}

#[test]
fn test_ranging_timeout_halts_with_laser_off() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    rig.ranger = ScriptedRanger::with_samples(Vec::<Result<f64, HardwareError>>::new(), None);
    let config = fast_config(1);
    let attempts = config.ranging_retries + 1;
    let mut seq = TargetSequencer::new(config).unwrap();

    let halted = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&halted);
    seq.register_callback(move |event| {
        if let TurretEvent::SequenceHalted { reason } = event {
            *sink.lock().unwrap() = Some(reason.clone());
        }
    });

    let err = seq.run(&mut rig.peripherals()).unwrap_err();

    assert!(matches!(
        err,
        SequencerError::SensorTimeout {
            what: "range sample",
            ..
        }
    ));
    assert_eq!(seq.state(), &SequencerState::Halted);
    assert_eq!(rig.ranger.calls(), attempts);
    assert_eq!(rig.laser_pulses(), 0);
    assert_eq!(rig.laser.history(), &[false]);
    assert!(rig.actuator.commands().is_empty());
    assert!(halted.lock().unwrap().is_some());
}

#[test]
fn test_transient_ranging_faults_are_retried() {
    init_logging();

    let timeout = HardwareError::Timeout {
        what: "echo rising edge",
        waited: Duration::from_millis(5),
    };
    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    rig.ranger = ScriptedRanger::with_samples(
        [
            Err(timeout.clone()),
            Err(HardwareError::InvalidSample(900.0)),
            Err(timeout),
        ],
        Some(100.0),
    );
    let config = fast_config(1);
    let expected_calls = config.range_warmup_samples + 1 + 3;
    let mut seq = TargetSequencer::new(config).unwrap();

    let summary = seq.run(&mut rig.peripherals()).unwrap();

    assert_eq!(summary.dispatched, 1);
    assert_eq!(rig.ranger.calls(), expected_calls);
}

#[test]
fn test_acknowledgement_timeout() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    rig.acknowledge = ScriptedInput::constant(false);
    let config = TurretConfig {
        ack_timeout_ms: Some(10),
        ..fast_config(1)
    };
    let mut seq = TargetSequencer::new(config).unwrap();

    let err = seq.run(&mut rig.peripherals()).unwrap_err();

    match err {
        SequencerError::SensorTimeout { what, waited } => {
            assert_eq!(what, "acknowledgement");
            assert!(waited >= Duration::from_millis(10));
        }
        other => panic!("expected acknowledgement timeout, got {other:?}"),
    }
    assert_eq!(seq.state(), &SequencerState::Halted);
    assert_eq!(rig.indicator.history().first(), Some(&true));
    assert!(!rig.indicator.level());
    assert_eq!(rig.laser_pulses(), 0);
}

#[test]
fn test_acknowledgement_after_a_few_polls() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    rig.acknowledge = ScriptedInput::new([false, false, false], true);
    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();

    seq.run(&mut rig.peripherals()).unwrap();

    assert_eq!(rig.acknowledge.reads(), 4);
    assert_eq!(rig.indicator.history(), &[true, false]);
}

#[test]
fn test_cancel_before_dispatch() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0), (600.0, 384.0)], 1));
    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();

    let cancel = seq.cancel_handle();
    seq.register_callback(move |event| {
        if matches!(event, TurretEvent::AcquisitionComplete { .. }) {
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let err = seq.run(&mut rig.peripherals()).unwrap_err();

    assert_eq!(err, SequencerError::Cancelled);
    assert_eq!(seq.state(), &SequencerState::Halted);
    assert!(rig.actuator.commands().is_empty());
    assert_eq!(rig.laser_pulses(), 0);
}

#[test]
fn test_cancel_interrupts_acknowledgement_wait() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    rig.acknowledge = ScriptedInput::constant(false);
    // No acknowledgement timeout: only the cancel flag ends the wait
    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();

    let cancel = seq.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.store(true, Ordering::Relaxed);
    });

    let err = seq.run(&mut rig.peripherals()).unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err, SequencerError::Cancelled);
    assert_eq!(seq.state(), &SequencerState::Halted);
    assert!(!rig.indicator.level());
    assert!(!rig.laser.level());
}

#[test]
fn test_laser_fault_halts_run() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0), (600.0, 384.0)], 1));
    rig.laser = RecordingOutput::failing_on_high();
    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();

    let err = seq.run(&mut rig.peripherals()).unwrap_err();

    assert!(matches!(err, SequencerError::Hardware(_)));
    assert_eq!(seq.state(), &SequencerState::Halted);
    // Only the forced-safe low level was ever written
    assert_eq!(rig.laser.history(), &[false]);
    // Servos moved for the first target only
    assert_eq!(rig.actuator.commands().len(), 2);
}

#[test]
fn test_vision_fault_halts_acquisition() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    rig.vision
        .push_error(HardwareError::Io("camera unplugged".to_string()));
    let mut seq = TargetSequencer::new(fast_config(3)).unwrap();

    let err = seq.run(&mut rig.peripherals()).unwrap_err();

    assert!(matches!(err, SequencerError::Hardware(_)));
    assert_eq!(seq.state(), &SequencerState::Halted);
    assert_eq!(rig.vision.captures(), 2);
    assert_eq!(rig.ranger.calls(), 0);
}

#[test]
fn test_no_targets_completes_immediately() {
    init_logging();

    let mut rig = Rig::new(vec![Vec::new(); 2]);
    let mut seq = TargetSequencer::new(fast_config(2)).unwrap();

    let summary = seq.run(&mut rig.peripherals()).unwrap();

    assert_eq!(summary, SequenceSummary::default());
    assert_eq!(rig.ranger.calls(), 0);
    assert_eq!(seq.state(), &SequencerState::Done);
    assert_eq!(rig.laser_pulses(), 0);
}

#[test]
fn test_events_in_order_and_rerun() {
    init_logging();

    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();
    let names = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&names);
    seq.register_callback(move |event| {
        let name = match event {
            TurretEvent::AcquisitionComplete { .. } => "acquired",
            TurretEvent::TargetAimed { .. } => "aimed",
            TurretEvent::TargetSkipped { .. } => "skipped",
            TurretEvent::SequenceHalted { .. } => "halted",
            TurretEvent::SequenceComplete { .. } => "complete",
        };
        sink.lock().unwrap().push(name);
    });

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0), (600.0, 384.0)], 1));
    seq.run(&mut rig.peripherals()).unwrap();
    assert_eq!(
        *names.lock().unwrap(),
        vec!["acquired", "aimed", "aimed", "complete"]
    );

    // A finished sequencer starts over on the next run
    names.lock().unwrap().clear();
    let mut rig = Rig::new(repeated_frames(&[(400.0, 384.0)], 1));
    let summary = seq.run(&mut rig.peripherals()).unwrap();
    assert_eq!(summary.dispatched, 1);
    assert_eq!(*names.lock().unwrap(), vec!["acquired", "aimed", "complete"]);
}

#[test]
fn test_dispatch_requires_ranked_targets() {
    init_logging();

    let mut rig = Rig::new(Vec::new());
    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();

    let err = seq.dispatch_next(&mut rig.peripherals()).unwrap_err();
    assert!(matches!(
        err,
        SequencerError::InvalidState {
            operation: "dispatch",
            state: SequencerState::Idle
        }
    ));
    // Invalid requests do not halt or touch outputs
    assert_eq!(seq.state(), &SequencerState::Idle);
    assert!(rig.laser.history().is_empty());
}

#[test]
fn test_cancel_interrupts_blocked_ranging() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    // Echo never rises and ranging has no timeout
    let mut ranger = EchoRanger::new(RecordingOutput::default(), ScriptedInput::constant(false));
    let config = TurretConfig {
        ranging_timeout_ms: None,
        ..fast_config(1)
    };
    let mut seq = TargetSequencer::new(config).unwrap();

    let cancel = seq.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.store(true, Ordering::Relaxed);
    });

    let mut peripherals = TurretPeripherals {
        vision: &mut rig.vision,
        ranger: &mut ranger,
        acknowledge: &mut rig.acknowledge,
        actuator: &mut rig.actuator,
        indicator: &mut rig.indicator,
        laser: &mut rig.laser,
        buzzer: None,
    };
    let err = seq.run(&mut peripherals).unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err, SequencerError::Cancelled);
    assert_eq!(seq.state(), &SequencerState::Halted);
    assert!(rig.actuator.commands().is_empty());
    assert!(!rig.laser.level());
}

#[test]
fn test_cancel_before_run_is_honoured_once() {
    init_logging();

    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();
    seq.cancel_handle().store(true, Ordering::Relaxed);

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    let err = seq.run(&mut rig.peripherals()).unwrap_err();
    assert_eq!(err, SequencerError::Cancelled);
    assert_eq!(seq.state(), &SequencerState::Halted);
    assert_eq!(rig.vision.captures(), 0);

    // The flag is re-armed after the cancelled run
    assert!(!seq.cancel_handle().load(Ordering::Relaxed));
    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    let summary = seq.run(&mut rig.peripherals()).unwrap();
    assert_eq!(summary.dispatched, 1);
}

#[test]
fn test_buzzer_is_optional_and_quiet_on_success() {
    init_logging();

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    let mut seq = TargetSequencer::new(fast_config(1)).unwrap();
    seq.run(&mut rig.peripherals()).unwrap();
    assert!(rig.buzzer.history().is_empty());

    let mut rig = Rig::new(repeated_frames(&[(512.0, 384.0)], 1));
    let mut peripherals = rig.peripherals();
    peripherals.buzzer = None;
    let summary = seq.run(&mut peripherals).unwrap();
    assert_eq!(summary.dispatched, 1);
}
