//! Ordering of finalized targets by proximity to a reference marker.

use serde::{Deserialize, Serialize};

use crate::clustering::Target;

/// How targets at nearly equal distance are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    /// Chains of targets whose successive distances differ by at most the
    /// tolerance are sorted left to right as one group.
    #[default]
    Grouped,
    /// A single adjacent-swap pass after the distance sort. Three or more
    /// tied targets may stay out of left-to-right order.
    LegacySinglePass,
}

/// A target together with its distance to the reference marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedTarget {
    pub target: Target,
    pub distance: f64,
}

/// Sort targets by distance to `reference`, then order ties left to right.
pub fn rank_targets(
    targets: &[Target],
    reference: (f64, f64),
    tolerance: f64,
    tie_break: TieBreak,
) -> Vec<RankedTarget> {
    let mut ranked: Vec<RankedTarget> = targets
        .iter()
        .map(|t| RankedTarget {
            target: *t,
            distance: t.distance_to(reference),
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    apply_tie_break(&mut ranked, tolerance, tie_break);
    ranked
}

/// Reorder a distance-sorted list so near-equal distances run left to right.
pub fn apply_tie_break(ranked: &mut [RankedTarget], tolerance: f64, tie_break: TieBreak) {
    match tie_break {
        TieBreak::Grouped => {
            let mut start = 0;
            while start < ranked.len() {
                let mut end = start + 1;
                while end < ranked.len()
                    && (ranked[end].distance - ranked[end - 1].distance).abs() <= tolerance
                {
                    end += 1;
                }
                ranked[start..end].sort_by(|a, b| a.target.px.total_cmp(&b.target.px));
                start = end;
            }
        }
        TieBreak::LegacySinglePass => {
            for i in 0..ranked.len().saturating_sub(1) {
                let close = (ranked[i].distance - ranked[i + 1].distance).abs() <= tolerance;
                if close && ranked[i].target.px > ranked[i + 1].target.px {
                    ranked.swap(i, i + 1);
                }
            }
        }
    }
}
