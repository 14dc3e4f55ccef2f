//! Registration Benchmarks
//!
//! Benchmarks for the per-frame CPU cost of localization:
//! - Voxel grid downsampling of scans and maps
//! - Point-to-point ICP against a k-d tree target
//! - Heading search over the bootstrap candidates
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use std::time::Duration;

use sthana_loc::{
    AbsolutePositionFix, HeadingSearch, InitialPoseEstimator, Point, PointCloud,
    PointToPointIcp, Pose3D, Registrar, RegistrationParams, TargetCloud, VoxelGridDownsampler,
};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Hash-based offset in (-scale, scale), stable across runs.
fn jitter(i: usize, axis: u64, scale: f32) -> f32 {
    let mut h = (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (axis + 1).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 31;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 29;
    ((h >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0) * scale
}

/// Corridor with a floor and two side walls, `length` meters long.
fn create_corridor_map(length: usize, spacing: f32) -> PointCloud {
    let mut raw = Vec::new();
    let steps = (length as f32 / spacing) as usize;

    for ix in 0..steps {
        let x = ix as f32 * spacing;
        for iy in 0..(6.0 / spacing) as usize {
            raw.push((x, -3.0 + iy as f32 * spacing, 0.0));
        }
        for h in 1..(4.0 / spacing) as usize {
            let z = h as f32 * spacing;
            raw.push((x, -3.0, z));
            // Doorways break the symmetry along x
            if ix % 17 > 2 {
                raw.push((x, 3.0, z));
            }
        }
    }

    let points = raw
        .into_iter()
        .enumerate()
        .map(|(i, (x, y, z))| {
            Point::new(
                x + jitter(i, 0, 0.01),
                y + jitter(i, 1, 0.01),
                z + jitter(i, 2, 0.01),
                (i % 255) as f32,
            )
        })
        .collect();

    PointCloud::from_points(points, "world", 0)
}

/// Scan seen from `pose`, in the sensor frame.
fn create_scan(map: &PointCloud, pose: &Pose3D, radius: f32) -> PointCloud {
    let origin = pose.translation();
    let nearby: Vec<Point> = map
        .iter()
        .filter(|p| {
            let dx = p.x - origin.x as f32;
            let dy = p.y - origin.y as f32;
            let dz = p.z - origin.z as f32;
            dx * dx + dy * dy + dz * dz <= radius * radius
        })
        .copied()
        .collect();

    PointCloud::from_points(nearby, "nuscenes_lidar", 0).transformed(&pose.inverse())
}

// ============================================================================
// Downsampling Benchmarks
// ============================================================================

fn bench_downsampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("downsampling");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(3));
    group.warm_up_time(Duration::from_secs(1));

    let voxel = VoxelGridDownsampler::new();
    let map = create_corridor_map(60, 0.1);
    let scan = create_scan(&map, &Pose3D::from_translation_yaw(30.0, 0.0, 1.8, 0.05), 15.0);

    group.bench_function("voxel/scan_0.3", |b| {
        b.iter(|| voxel.apply(black_box(&scan), 0.3))
    });

    group.bench_function("voxel/map_0.3", |b| {
        b.iter(|| voxel.apply(black_box(&map), 0.3))
    });

    group.bench_function("kdtree/build", |b| {
        b.iter(|| {
            let target = TargetCloud::new(black_box(map.clone()));
            target.tree();
            target
        })
    });

    group.finish();
}

// ============================================================================
// Registration Benchmarks
// ============================================================================

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(1));

    let voxel = VoxelGridDownsampler::new();
    let map = create_corridor_map(60, 0.25);
    let truth = Pose3D::from_translation_yaw(30.0, 0.0, 1.8, 0.05);
    let scan = voxel.apply(&create_scan(&map, &truth, 15.0), 0.25);
    let target = TargetCloud::new(map);

    let icp = PointToPointIcp::new();
    let tracking = RegistrationParams::tracking();
    let guess = Pose3D::from_translation_yaw(29.9, 0.05, 1.8, 0.045);

    group.bench_function("icp/tracking", |b| {
        b.iter(|| icp.register(black_box(&scan), &target, &guess, &tracking))
    });

    let estimator = InitialPoseEstimator::new(Arc::new(PointToPointIcp::new()));
    let fix = AbsolutePositionFix::new(30.0, 0.0, 1.8, 0);
    let search = HeadingSearch::default();
    let bootstrap = RegistrationParams::bootstrap();

    group.bench_function("heading_search/5", |b| {
        b.iter(|| estimator.estimate(&fix, &target, black_box(&scan), &search, &bootstrap))
    });

    group.finish();
}

criterion_group!(benches, bench_downsampling, bench_registration);
criterion_main!(benches);
