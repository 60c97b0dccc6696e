//! Shared components for the turret crates.
//!
//! Holds the pure aiming geometry, the range smoothing filter, the mount
//! calibration and the blob observation types so that the hardware layer and
//! the sequencer agree on a single definition of each.

pub mod blob;
pub mod geometry;
pub mod mount_geometry;
pub mod range_filter;

pub use blob::{BlobFilter, PixelObservation, RegionOfInterest};
pub use geometry::{AimResult, GeometryError, Point3, RotationAxis};
pub use mount_geometry::{MountGeometry, SensorResolution};
pub use range_filter::{RangeFilter, RangeFilterEmpty, DEFAULT_RANGE_FILTER_CAPACITY};
