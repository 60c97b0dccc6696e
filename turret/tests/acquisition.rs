//! Accumulation, matching and ranking through the sequencer's frame interface

mod common;

use approx::assert_abs_diff_eq;
use common::{blob, fast_config};
use shared::blob::{BlobFilter, PixelObservation, RegionOfInterest};
use turret::{
    MatchingStrategy, SequencerEvent, SequencerState, TargetSequencer, TieBreak, TurretConfig,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn accumulate(config: TurretConfig, frames: &[Vec<PixelObservation>]) -> TargetSequencer {
    let mut seq = TargetSequencer::new(config).unwrap();
    seq.process_event(SequencerEvent::Start).unwrap();
    for frame in frames {
        seq.process_frame(frame).unwrap();
    }
    assert_eq!(seq.state(), &SequencerState::Ranked);
    seq
}

fn positions(seq: &TargetSequencer) -> Vec<(f64, f64)> {
    seq.ranked_targets()
        .iter()
        .map(|r| (r.target.px, r.target.py))
        .collect()
}

/// Two targets whose report order flips between frames.
fn shuffled_frames() -> Vec<Vec<PixelObservation>> {
    vec![
        vec![blob(100.0, 100.0), blob(400.0, 300.0)],
        vec![blob(402.0, 300.0), blob(98.0, 100.0)],
    ]
}

#[test]
fn test_nearest_neighbour_follows_targets() {
    init_logging();

    let seq = accumulate(fast_config(2), &shuffled_frames());
    let found = positions(&seq);

    assert_eq!(found.len(), 2);
    assert_abs_diff_eq!(found[0].0, 401.0, epsilon = 1e-9);
    assert_abs_diff_eq!(found[1].0, 99.0, epsilon = 1e-9);
    assert!(seq
        .ranked_targets()
        .iter()
        .all(|r| r.target.frame_count == 2));
}

#[test]
fn test_positional_matching_mixes_reordered_targets() {
    init_logging();

    let config = TurretConfig {
        matching: MatchingStrategy::Positional,
        ..fast_config(2)
    };
    let seq = accumulate(config, &shuffled_frames());

    // Slot-by-index averaging blends the two targets together
    for (px, py) in positions(&seq) {
        assert_abs_diff_eq!(px, 250.0, epsilon = 1.5);
        assert_abs_diff_eq!(py, 200.0, epsilon = 1e-9);
    }
}

#[test]
fn test_targets_beyond_capacity_are_dropped() {
    init_logging();

    let config = TurretConfig {
        max_targets: 2,
        ..fast_config(1)
    };
    let frame = vec![blob(10.0, 10.0), blob(200.0, 10.0), blob(400.0, 10.0)];
    let seq = accumulate(config, &[frame]);
    assert_eq!(seq.ranked_targets().len(), 2);
}

#[test]
fn test_min_observations_drops_flicker() {
    init_logging();

    let config = TurretConfig {
        min_observations: 2,
        ..fast_config(3)
    };
    let frames = vec![
        vec![blob(100.0, 100.0), blob(700.0, 500.0)],
        vec![blob(100.0, 100.0)],
        vec![blob(100.0, 100.0)],
    ];
    let seq = accumulate(config, &frames);

    assert_eq!(positions(&seq), vec![(100.0, 100.0)]);
    assert_eq!(seq.ranked_targets()[0].target.frame_count, 3);
}

#[test]
fn test_equidistant_targets_run_left_to_right() {
    init_logging();

    // All 100 px from the (512, 384) reference
    let frame = vec![blob(612.0, 384.0), blob(512.0, 284.0), blob(412.0, 384.0)];

    let grouped = accumulate(fast_config(1), &[frame.clone()]);
    let xs: Vec<f64> = positions(&grouped).iter().map(|p| p.0).collect();
    assert_eq!(xs, vec![412.0, 512.0, 612.0]);

    let config = TurretConfig {
        tie_break: TieBreak::LegacySinglePass,
        ..fast_config(1)
    };
    let legacy = accumulate(config, &[frame]);
    // One adjacent-swap pass leaves a three-way tie partly unordered
    let xs: Vec<f64> = positions(&legacy).iter().map(|p| p.0).collect();
    assert_eq!(xs, vec![512.0, 412.0, 612.0]);
}

#[test]
fn test_distinct_distances_ignore_horizontal_order() {
    init_logging();

    let config = TurretConfig {
        tie_tolerance_px: 1.0,
        ..fast_config(1)
    };
    let frame = vec![blob(412.0, 384.0), blob(542.0, 384.0)];
    let seq = accumulate(config, &[frame]);
    let xs: Vec<f64> = positions(&seq).iter().map(|p| p.0).collect();
    assert_eq!(xs, vec![542.0, 412.0]);
}

#[test]
fn test_screening_applies_before_matching() {
    init_logging();

    let config = TurretConfig {
        blob_filter: BlobFilter {
            roi: Some(RegionOfInterest::new(0.0, 0.0, 512.0, 768.0)),
            ..BlobFilter::default()
        },
        ..fast_config(1)
    };
    let frame = vec![
        blob(100.0, 100.0),
        // Right half, outside the region
        blob(800.0, 100.0),
        // Too small
        PixelObservation::new(200.0, 200.0, 5.0, 0.9),
        // Too elongated
        PixelObservation::new(300.0, 300.0, 150.0, 0.2),
        // Off the sensor
        blob(-5.0, 100.0),
    ];
    let seq = accumulate(config, &[frame]);
    assert_eq!(positions(&seq), vec![(100.0, 100.0)]);
}
