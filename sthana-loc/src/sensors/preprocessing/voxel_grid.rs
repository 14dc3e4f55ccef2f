//! Voxel grid downsampling for 3D point clouds.
//!
//! Space is divided into cubic cells of `leaf_size` meters. Every occupied
//! cell is replaced by the centroid of the points it contains.
//!
//! # Properties
//!
//! - Output never has more points than input.
//! - Output is ordered by the first occurrence of each cell in the input,
//!   so identical inputs always give identical outputs.
//! - A centroid stays inside its own cell, therefore downsampling an already
//!   downsampled cloud with the same leaf size returns it unchanged.

use std::collections::HashMap;

use crate::core::types::{Point, PointCloud};

/// Running sum for one voxel.
#[derive(Debug, Clone, Copy, Default)]
struct VoxelAccumulator {
    x: f64,
    y: f64,
    z: f64,
    intensity: f64,
    count: u32,
}

impl VoxelAccumulator {
    #[inline]
    fn add(&mut self, p: &Point) {
        self.x += p.x as f64;
        self.y += p.y as f64;
        self.z += p.z as f64;
        self.intensity += p.intensity as f64;
        self.count += 1;
    }

    #[inline]
    fn centroid(&self) -> Point {
        let n = self.count as f64;
        Point::new(
            (self.x / n) as f32,
            (self.y / n) as f32,
            (self.z / n) as f32,
            (self.intensity / n) as f32,
        )
    }
}

/// Centroid-based voxel grid filter.
///
/// Non-finite points are dropped. A non-positive or non-finite leaf size
/// disables downsampling (finite points are passed through unchanged).
#[derive(Debug, Clone, Default)]
pub struct VoxelGridDownsampler;

impl VoxelGridDownsampler {
    /// Create a new downsampler.
    pub fn new() -> Self {
        Self
    }

    /// Apply voxel downsampling with the given cell size.
    pub fn apply(&self, cloud: &PointCloud, leaf_size: f32) -> PointCloud {
        if !(leaf_size.is_finite() && leaf_size > 0.0) {
            log::warn!("Invalid leaf size {}, skipping downsampling", leaf_size);
            return cloud.with_points(cloud.iter().filter(|p| p.is_finite()).copied().collect());
        }

        let inv_leaf = 1.0 / leaf_size as f64;
        let mut index: HashMap<(i64, i64, i64), usize> = HashMap::with_capacity(cloud.len());
        let mut voxels: Vec<VoxelAccumulator> = Vec::new();

        for p in cloud.iter().filter(|p| p.is_finite()) {
            let key = (
                (p.x as f64 * inv_leaf).floor() as i64,
                (p.y as f64 * inv_leaf).floor() as i64,
                (p.z as f64 * inv_leaf).floor() as i64,
            );

            let slot = *index.entry(key).or_insert_with(|| {
                voxels.push(VoxelAccumulator::default());
                voxels.len() - 1
            });
            voxels[slot].add(p);
        }

        cloud.with_points(voxels.iter().map(VoxelAccumulator::centroid).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scattered_cloud(n: usize) -> PointCloud {
        let mut cloud = PointCloud::new("lidar", 0);
        for i in 0..n {
            let t = i as f32 * 0.37;
            cloud.push(Point::new(
                (t * 1.3).sin() * 5.0,
                (t * 0.7).cos() * 5.0,
                (t * 0.11).sin() * 2.0,
                (i % 17) as f32,
            ));
        }
        cloud
    }

    #[test]
    fn test_points_in_same_voxel_merge_to_centroid() {
        let cloud = PointCloud::from_points(
            vec![
                Point::new(0.1, 0.1, 0.1, 10.0),
                Point::new(0.3, 0.3, 0.3, 30.0),
                Point::new(1.5, 0.1, 0.1, 5.0),
            ],
            "lidar",
            9,
        );

        let out = VoxelGridDownsampler::new().apply(&cloud, 1.0);

        assert_eq!(out.len(), 2);
        assert_eq!(out.frame_id, "lidar");
        assert_eq!(out.timestamp_us, 9);
        assert_relative_eq!(out.points[0].x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(out.points[0].intensity, 20.0, epsilon = 1e-6);
        assert_relative_eq!(out.points[1].x, 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_coordinates_use_floor() {
        // -0.2 and 0.2 straddle the origin and must land in different cells
        let cloud = PointCloud::from_points(
            vec![Point::xyz(-0.2, 0.0, 0.0), Point::xyz(0.2, 0.0, 0.0)],
            "lidar",
            0,
        );
        let out = VoxelGridDownsampler::new().apply(&cloud, 1.0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_never_grows() {
        let cloud = scattered_cloud(2000);
        for leaf in [0.05, 0.3, 1.0, 4.0] {
            let out = VoxelGridDownsampler::new().apply(&cloud, leaf);
            assert!(out.len() <= cloud.len());
            assert!(!out.is_empty());
        }
    }

    #[test]
    fn test_idempotent() {
        let cloud = scattered_cloud(2000);
        let voxel = VoxelGridDownsampler::new();

        for leaf in [0.1, 0.5, 2.0] {
            let once = voxel.apply(&cloud, leaf);
            let twice = voxel.apply(&once, leaf);
            assert_eq!(once, twice, "not a fixed point for leaf {leaf}");
        }
    }

    #[test]
    fn test_drops_non_finite() {
        let cloud = PointCloud::from_points(
            vec![
                Point::xyz(f32::NAN, 0.0, 0.0),
                Point::xyz(1.0, 1.0, 1.0),
                Point::xyz(0.0, f32::INFINITY, 0.0),
            ],
            "lidar",
            0,
        );
        let out = VoxelGridDownsampler::new().apply(&cloud, 0.5);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_invalid_leaf_passes_through() {
        let cloud = scattered_cloud(50);
        let out = VoxelGridDownsampler::new().apply(&cloud, 0.0);
        assert_eq!(out.len(), 50);
    }
}
