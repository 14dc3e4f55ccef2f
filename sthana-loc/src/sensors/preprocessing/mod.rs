//! Point cloud preprocessing.
//!
//! Density reduction applied to both the prior map (once) and every scan
//! (per frame) before registration.
//!
//! # Downsampler Trait
//!
//! The tracker only depends on [`Downsampler`], so any spatial reduction
//! strategy can be injected:
//!
//! ```ignore
//! use sthana_loc::sensors::preprocessing::{Downsampler, VoxelGridDownsampler};
//!
//! let voxel = VoxelGridDownsampler::new();
//! let reduced = voxel.downsample(&scan, 0.3);
//! println!("{}: {} -> {} points", voxel.name(), scan.len(), reduced.len());
//! ```

mod voxel_grid;

pub use voxel_grid::VoxelGridDownsampler;

use crate::core::types::PointCloud;

/// Trait for spatial downsampling of point clouds.
///
/// Implementations must never return more points than they receive.
pub trait Downsampler: Send + Sync {
    /// Reduce point density using cubic cells of `leaf_size` meters.
    fn downsample(&self, cloud: &PointCloud, leaf_size: f32) -> PointCloud;

    /// Name of this downsampler for diagnostics.
    fn name(&self) -> &'static str;
}

impl Downsampler for VoxelGridDownsampler {
    fn downsample(&self, cloud: &PointCloud, leaf_size: f32) -> PointCloud {
        self.apply(cloud, leaf_size)
    }

    fn name(&self) -> &'static str {
        "VoxelGrid"
    }
}
