//! ICP against maps with shared coordinates.
//!
//! Real maps contain flat ground, facades and quantized points; the target
//! index and the registrar must handle them without noise added.

mod common;

use std::sync::Arc;

use common::{scan_at, street_map_exact};
use sthana_loc::{
    AbsolutePositionFix, HeadingSearch, InitialPoseEstimator, Point, PointCloud,
    PointToPointIcp, PoseTracker, PoseTrackerConfig, Pose3D, Registrar, RegistrationParams,
    TargetCloud, VoxelGridDownsampler,
};

/// Facade on the plane x = 30 plus a strip of ground, all on an exact grid.
fn facade_map() -> PointCloud {
    let mut points = Vec::new();
    for iy in 0..36 {
        for h in 0..10 {
            points.push(Point::xyz(30.0, iy as f32 * 0.5, h as f32 * 0.5));
        }
    }
    for ix in 0..20 {
        for iy in 0..36 {
            points.push(Point::xyz(20.0 + ix as f32 * 0.5, iy as f32 * 0.5, 0.0));
        }
    }
    PointCloud::from_points(points, "world", 0)
}

#[test]
fn test_tracker_on_planar_facade() {
    let map = facade_map();
    let truth = Pose3D::from_translation_yaw(25.0, 8.0, 1.5, 0.0);
    let scan = scan_at(&map, &truth, 20.0, 0);

    let mut tracker = PoseTracker::new(
        &map,
        Arc::new(PointToPointIcp::new()),
        Arc::new(VoxelGridDownsampler::new()),
        PoseTrackerConfig {
            scan_leaf_size: 0.25,
            map_leaf_size: 0.25,
            ..Default::default()
        },
    );
    tracker.seed(truth);

    let result = tracker.update(&scan).unwrap();
    assert!(result.fitness < 1e-6, "fitness {}", result.fitness);
    assert!(result.transform.translation_distance(&truth) < 0.01);
    assert_eq!(tracker.stats().failed_frames, 0);
}

#[test]
fn test_icp_on_exact_street_map() {
    let map = street_map_exact();
    let truth = Pose3D::from_xyz_ypr(10.0, 5.0, 1.8, 0.1, 0.0, 0.0);
    let scan = scan_at(&map, &truth, 12.0, 0);
    let guess = Pose3D::from_xyz_ypr(10.08, 4.95, 1.8, 0.105, 0.0, 0.0);

    let target = TargetCloud::new(map);
    let result =
        PointToPointIcp::new().register(&scan, &target, &guess, &RegistrationParams::tracking());

    assert!(result.fitness < 1e-6, "fitness {}", result.fitness);
    assert_eq!(result.correspondences, scan.len());
    assert!(result.transform.translation_distance(&truth) < 0.01);
    assert!(result.transform.rotation_distance(&truth) < 0.002);
}

#[test]
fn test_heading_search_on_exact_street_map() {
    let map = street_map_exact();
    let truth = Pose3D::from_xyz_ypr(10.0, 5.0, 1.8, 0.1, 0.0, 0.0);
    let scan = scan_at(&map, &truth, 12.0, 0);

    let estimate = InitialPoseEstimator::new(Arc::new(PointToPointIcp::new()))
        .estimate(
            &AbsolutePositionFix::new(10.0, 5.0, 1.8, 0),
            &TargetCloud::new(map),
            &scan,
            &HeadingSearch::new(0.2, 0.05).unwrap(),
            &RegistrationParams::bootstrap(),
        )
        .unwrap();

    assert!(estimate.fitness < 1e-6, "fitness {}", estimate.fitness);
    assert!(estimate.pose.translation_distance(&truth) < 0.05);
    assert!(estimate.pose.rotation_distance(&truth) < 0.01);
}
