use std::path::Path;
use std::time::Duration;

use hardware::ServoLimits;
use serde::{Deserialize, Serialize};
use shared::blob::BlobFilter;
use shared::mount_geometry::MountGeometry;
use shared::range_filter::DEFAULT_RANGE_FILTER_CAPACITY;
use thiserror::Error;

use crate::clustering::MatchingStrategy;
use crate::ranking::TieBreak;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the target sequencer and its control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurretConfig {
    /// Mount calibration used for every aim computation
    pub mount: MountGeometry,
    /// Number of frames to accumulate before ranking
    pub acquisition_frames: usize,
    /// Maximum number of targets tracked during accumulation
    pub max_targets: usize,
    /// Frames a target must appear in to survive accumulation
    pub min_observations: usize,
    /// Blob to estimate correspondence across frames
    pub matching: MatchingStrategy,
    /// Pixel the targets are ranked by distance from
    pub reference_marker: (f64, f64),
    /// Distance difference (pixels) below which targets are ordered left to right
    pub tie_tolerance_px: f64,
    pub tie_break: TieBreak,
    /// Threshold predicate passed to the vision service
    pub blob_filter: BlobFilter,
    /// Slots in the range moving average
    pub range_filter_capacity: usize,
    /// Range samples taken before the first target to fill the moving average
    pub range_warmup_samples: usize,
    /// Per-sample ranging timeout in milliseconds (None blocks)
    pub ranging_timeout_ms: Option<u64>,
    /// Extra ranging attempts after a timeout or invalid sample
    pub ranging_retries: usize,
    /// Poll interval for the acknowledgement input in milliseconds
    pub ack_poll_interval_ms: u64,
    /// Acknowledgement timeout in milliseconds (None waits indefinitely)
    pub ack_timeout_ms: Option<u64>,
    /// Delay after commanding the servos before firing, in milliseconds
    pub settle_delay_ms: u64,
    /// Laser on-time per target in milliseconds
    pub laser_dwell_ms: u64,
    /// Buzzer on-time when a target is skipped, in milliseconds
    pub buzz_ms: u64,
    pub servo_limits: ServoLimits,
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            mount: MountGeometry::default(),
            acquisition_frames: 5,
            max_targets: 5,
            min_observations: 1,
            matching: MatchingStrategy::default(),
            reference_marker: (300.0, 300.0),
            tie_tolerance_px: 10.0,
            tie_break: TieBreak::default(),
            blob_filter: BlobFilter::default(),
            range_filter_capacity: DEFAULT_RANGE_FILTER_CAPACITY,
            range_warmup_samples: DEFAULT_RANGE_FILTER_CAPACITY,
            ranging_timeout_ms: Some(100),
            ranging_retries: 3,
            ack_poll_interval_ms: 50,
            ack_timeout_ms: None,
            settle_delay_ms: 1000,
            laser_dwell_ms: 1000,
            buzz_ms: 200,
            servo_limits: ServoLimits::default(),
        }
    }
}

impl TurretConfig {
    pub fn ranging_timeout(&self) -> Option<Duration> {
        self.ranging_timeout_ms.map(Duration::from_millis)
    }

    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(Duration::from_millis)
    }

    pub fn ack_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ack_poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn laser_dwell(&self) -> Duration {
        Duration::from_millis(self.laser_dwell_ms)
    }

    pub fn buzz_duration(&self) -> Duration {
        Duration::from_millis(self.buzz_ms)
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mount
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.acquisition_frames == 0 {
            return Err(ConfigError::Invalid(
                "acquisition_frames must be at least 1".to_string(),
            ));
        }
        if self.max_targets == 0 {
            return Err(ConfigError::Invalid(
                "max_targets must be at least 1".to_string(),
            ));
        }
        if self.min_observations > self.acquisition_frames {
            return Err(ConfigError::Invalid(format!(
                "min_observations ({}) exceeds acquisition_frames ({})",
                self.min_observations, self.acquisition_frames
            )));
        }
        if let MatchingStrategy::NearestNeighbor { gate_px } = self.matching {
            if !gate_px.is_finite() || gate_px <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "nearest-neighbour gate must be positive, got {gate_px}"
                )));
            }
        }
        if !self.tie_tolerance_px.is_finite() || self.tie_tolerance_px < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tie_tolerance_px must be non-negative, got {}",
                self.tie_tolerance_px
            )));
        }
        let (min_area, max_area) = self.blob_filter.area_range;
        if min_area > max_area {
            return Err(ConfigError::Invalid(format!(
                "blob area range is empty: ({min_area}, {max_area})"
            )));
        }
        if self.range_filter_capacity == 0 {
            return Err(ConfigError::Invalid(
                "range_filter_capacity must be at least 1".to_string(),
            ));
        }
        if self.ack_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "ack_poll_interval_ms must be at least 1".to_string(),
            ));
        }
        self.servo_limits.validate().map_err(ConfigError::Invalid)?;

        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!("Loaded turret config from {}", path.display());
        Ok(config)
    }
}
