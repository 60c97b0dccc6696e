//! Per-frame blob screening.
//!
//! The vision collaborator is handed the same [`BlobFilter`], but its
//! thresholding is not trusted: every observation is checked again here,
//! stage by stage, with counts logged after each stage.

use shared::blob::{BlobFilter, PixelObservation};
use shared::mount_geometry::SensorResolution;

#[derive(Debug, Clone)]
pub struct BlobStats {
    pub count: usize,
    pub largest_area: f64,
    pub smallest_area: f64,
    pub mean_roundness: f64,
}

impl BlobStats {
    pub fn log(&self, note: &str) {
        log::debug!(
            "{}: count={}, largest={:.0}, smallest={:.0}, mean roundness={:.2}",
            note,
            self.count,
            self.largest_area,
            self.smallest_area,
            self.mean_roundness
        );
    }
}

pub fn calculate_blob_stats(blobs: &[PixelObservation]) -> Option<BlobStats> {
    if blobs.is_empty() {
        return None;
    }

    let count = blobs.len();
    let largest_area = blobs.iter().map(|b| b.area).fold(f64::NEG_INFINITY, f64::max);
    let smallest_area = blobs.iter().map(|b| b.area).fold(f64::INFINITY, f64::min);
    let mean_roundness = blobs.iter().map(|b| b.roundness).sum::<f64>() / count as f64;

    Some(BlobStats {
        count,
        largest_area,
        smallest_area,
        mean_roundness,
    })
}

fn apply_stage<F>(blobs: Vec<PixelObservation>, stage: &str, passes: F) -> Vec<PixelObservation>
where
    F: Fn(&PixelObservation) -> bool,
{
    let kept: Vec<PixelObservation> = blobs
        .into_iter()
        .filter(|blob| {
            let ok = passes(blob);
            if !ok {
                log::debug!(
                    "Blob rejected by {stage} filter: position=({:.1}, {:.1}), area={:.0}, roundness={:.2}",
                    blob.px,
                    blob.py,
                    blob.area,
                    blob.roundness
                );
            }
            ok
        })
        .collect();

    match calculate_blob_stats(&kept) {
        Some(stats) => stats.log(&format!("After {stage} filter")),
        None => log::debug!("All blobs filtered out by {stage} filter"),
    }
    kept
}

/// Keep only blobs inside the frame that pass every threshold of `filter`.
pub fn screen_blobs(
    blobs: &[PixelObservation],
    filter: &BlobFilter,
    resolution: &SensorResolution,
) -> Vec<PixelObservation> {
    if let Some(stats) = calculate_blob_stats(blobs) {
        stats.log("Reported blobs");
    }

    let kept = apply_stage(blobs.to_vec(), "frame bounds", |b| {
        b.px.is_finite() && b.py.is_finite() && resolution.contains(b.px, b.py)
    });
    let kept = apply_stage(kept, "region", |b| filter.in_region(b));
    let kept = apply_stage(kept, "area", |b| filter.area_ok(b));
    apply_stage(kept, "roundness", |b| filter.roundness_ok(b))
}
