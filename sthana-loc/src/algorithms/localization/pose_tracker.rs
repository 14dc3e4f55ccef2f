//! Frame-to-map pose tracking.
//!
//! Keeps a single map→sensor transform. Each scan is downsampled and
//! registered against the (pre-downsampled) prior map, starting from the
//! previous result. The motion model is constant pose: the last refined
//! transform is the next guess, unmodified.

use std::sync::Arc;

use crate::algorithms::matching::{
    Registrar, RegistrationParams, RegistrationResult, TargetCloud,
};
use crate::core::types::{PointCloud, Pose3D};
use crate::error::{LocalizationError, Result};
use crate::sensors::preprocessing::Downsampler;

/// Configuration for [`PoseTracker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTrackerConfig {
    /// Voxel size applied to every scan (meters).
    pub scan_leaf_size: f32,
    /// Voxel size applied once to the prior map (meters).
    pub map_leaf_size: f32,
    /// Registration parameters for steady-state tracking.
    pub registration: RegistrationParams,
    /// Fitness above which a frame is reported as low confidence (m²).
    pub fitness_warn_threshold: f64,
}

impl Default for PoseTrackerConfig {
    fn default() -> Self {
        Self {
            scan_leaf_size: 0.3,
            map_leaf_size: 0.3,
            registration: RegistrationParams::tracking(),
            fitness_warn_threshold: 1.0,
        }
    }
}

/// Running diagnostics. Informational only, never fed back into tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackerStats {
    /// Frames registered since seeding
    pub frames: u64,
    /// Sum of per-frame fitness, failed registrations excluded
    pub cumulative_fitness: f64,
    /// Frames that did not converge or exceeded the fitness threshold
    pub low_confidence_frames: u64,
    /// Frames whose registration could not produce a fitness
    pub failed_frames: u64,
}

impl TrackerStats {
    /// Mean fitness over scored frames, 0 when none was scored.
    pub fn mean_fitness(&self) -> f64 {
        let scored = self.frames - self.failed_frames;
        if scored == 0 {
            0.0
        } else {
            self.cumulative_fitness / scored as f64
        }
    }
}

/// Scan-to-map tracker with a chained warm start.
pub struct PoseTracker {
    map: TargetCloud,
    registrar: Arc<dyn Registrar>,
    downsampler: Arc<dyn Downsampler>,
    config: PoseTrackerConfig,
    current: Option<Pose3D>,
    stats: TrackerStats,
}

impl PoseTracker {
    /// Build a tracker; the map is downsampled once here.
    pub fn new(
        map: &PointCloud,
        registrar: Arc<dyn Registrar>,
        downsampler: Arc<dyn Downsampler>,
        config: PoseTrackerConfig,
    ) -> Self {
        let filtered = downsampler.downsample(map, config.map_leaf_size);
        log::info!(
            "Prior map: {} -> {} points ({}, leaf {:.2} m)",
            map.len(),
            filtered.len(),
            downsampler.name(),
            config.map_leaf_size
        );

        Self {
            map: TargetCloud::new(filtered),
            registrar,
            downsampler,
            config,
            current: None,
            stats: TrackerStats::default(),
        }
    }

    /// Downsampled prior map.
    pub fn map(&self) -> &TargetCloud {
        &self.map
    }

    pub fn config(&self) -> &PoseTrackerConfig {
        &self.config
    }

    /// Downsample a scan with the configured scan leaf size.
    pub fn filter_scan(&self, scan: &PointCloud) -> PointCloud {
        self.downsampler.downsample(scan, self.config.scan_leaf_size)
    }

    /// Set the initial map→sensor transform.
    pub fn seed(&mut self, pose: Pose3D) {
        self.current = Some(pose);
    }

    pub fn is_seeded(&self) -> bool {
        self.current.is_some()
    }

    /// Current map→sensor transform, `None` before seeding.
    pub fn current(&self) -> Option<&Pose3D> {
        self.current.as_ref()
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// Downsample `scan` and register it.
    pub fn update(&mut self, scan: &PointCloud) -> Result<RegistrationResult> {
        let filtered = self.filter_scan(scan);
        self.update_filtered(&filtered)
    }

    /// Register an already downsampled scan from the current transform.
    ///
    /// The returned transform becomes the current one even when the
    /// registration did not converge.
    pub fn update_filtered(&mut self, scan: &PointCloud) -> Result<RegistrationResult> {
        let guess = self.current.ok_or(LocalizationError::NotSeeded)?;
        if scan.is_empty() {
            return Err(LocalizationError::EmptyCloud("scan"));
        }

        let result = self
            .registrar
            .register(scan, &self.map, &guess, &self.config.registration);

        self.current = Some(result.transform);
        self.stats.frames += 1;

        // A failed registration reports f64::MAX; keep it out of the sum
        let scored = result.fitness < f64::MAX;
        if scored {
            self.stats.cumulative_fitness += result.fitness;
        } else {
            self.stats.failed_frames += 1;
        }

        if !scored || !result.converged || result.fitness > self.config.fitness_warn_threshold {
            self.stats.low_confidence_frames += 1;
            log::warn!(
                "Low confidence registration: fitness {:.4} (threshold {:.4}), converged: {}, iterations: {}",
                result.fitness,
                self.config.fitness_warn_threshold,
                result.converged,
                result.iterations
            );
        } else {
            log::debug!(
                "Registration: fitness {:.6}, {} iterations, {} correspondences",
                result.fitness,
                result.iterations,
                result.correspondences
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point;
    use crate::sensors::preprocessing::VoxelGridDownsampler;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    /// Shifts the guess by +1 m in x and reports fixed fitness values.
    struct Stepper {
        fitness: Vec<(f64, bool)>,
        guesses: Mutex<Vec<Pose3D>>,
    }

    impl Registrar for Stepper {
        fn register(
            &self,
            _source: &PointCloud,
            _target: &TargetCloud,
            initial_guess: &Pose3D,
            _params: &RegistrationParams,
        ) -> RegistrationResult {
            let mut guesses = self.guesses.lock().unwrap();
            let (fitness, converged) = self.fitness[guesses.len()];
            guesses.push(*initial_guess);
            RegistrationResult {
                transform: Pose3D::from_translation_yaw(1.0, 0.0, 0.0, 0.0).compose(initial_guess),
                fitness,
                converged,
                iterations: 3,
                correspondences: 10,
            }
        }

        fn name(&self) -> &'static str {
            "Stepper"
        }
    }

    fn dense_cloud(frame: &str) -> PointCloud {
        let mut cloud = PointCloud::new(frame, 0);
        for i in 0..10 {
            for j in 0..10 {
                cloud.push(Point::xyz(i as f32 * 0.1, j as f32 * 0.1, 0.0));
            }
        }
        cloud
    }

    fn tracker(fitness: Vec<(f64, bool)>) -> (PoseTracker, Arc<Stepper>) {
        let registrar = Arc::new(Stepper {
            fitness,
            guesses: Mutex::new(Vec::new()),
        });
        let tracker = PoseTracker::new(
            &dense_cloud("map"),
            registrar.clone(),
            Arc::new(VoxelGridDownsampler::new()),
            PoseTrackerConfig {
                scan_leaf_size: 0.5,
                map_leaf_size: 0.25,
                ..Default::default()
            },
        );
        (tracker, registrar)
    }

    #[test]
    fn test_map_downsampled_once() {
        let (tracker, _) = tracker(vec![]);
        // 1 m × 1 m at 0.1 spacing, 0.25 leaf -> 4 × 4 voxels
        assert_eq!(tracker.map().len(), 16);
        assert_eq!(tracker.filter_scan(&dense_cloud("lidar")).len(), 4);
    }

    #[test]
    fn test_update_before_seed_fails() {
        let (mut tracker, _) = tracker(vec![(0.1, true)]);
        assert!(!tracker.is_seeded());
        assert!(matches!(
            tracker.update(&dense_cloud("lidar")),
            Err(LocalizationError::NotSeeded)
        ));
    }

    #[test]
    fn test_warm_start_chains_results() {
        let (mut tracker, registrar) = tracker(vec![(0.1, true), (0.2, true), (0.3, true)]);
        tracker.seed(Pose3D::from_translation_yaw(10.0, 5.0, 0.0, 0.0));

        for _ in 0..3 {
            tracker.update(&dense_cloud("lidar")).unwrap();
        }

        let guesses = registrar.guesses.lock().unwrap();
        assert_relative_eq!(guesses[0].translation().x, 10.0);
        assert_relative_eq!(guesses[1].translation().x, 11.0);
        assert_relative_eq!(guesses[2].translation().x, 12.0);
        assert_relative_eq!(tracker.current().unwrap().translation().x, 13.0);

        let stats = tracker.stats();
        assert_eq!(stats.frames, 3);
        assert_relative_eq!(stats.cumulative_fitness, 0.6, epsilon = 1e-12);
        assert_relative_eq!(stats.mean_fitness(), 0.2, epsilon = 1e-12);
        assert_eq!(stats.low_confidence_frames, 0);
    }

    #[test]
    fn test_low_confidence_counted_but_used() {
        let (mut tracker, _) = tracker(vec![(0.1, false), (5.0, true), (0.1, true)]);
        tracker.seed(Pose3D::identity());

        for _ in 0..3 {
            tracker.update(&dense_cloud("lidar")).unwrap();
        }

        assert_eq!(tracker.stats().low_confidence_frames, 2);
        // Non-converged results still advance the estimate
        assert_relative_eq!(tracker.current().unwrap().translation().x, 3.0);
    }

    #[test]
    fn test_failed_registration_kept_out_of_sum() {
        let (mut tracker, _) = tracker(vec![
            (0.2, true),
            (f64::MAX, false),
            (f64::MAX, false),
            (0.4, true),
        ]);
        tracker.seed(Pose3D::identity());

        for _ in 0..4 {
            tracker.update(&dense_cloud("lidar")).unwrap();
        }

        let stats = tracker.stats();
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.failed_frames, 2);
        assert_eq!(stats.low_confidence_frames, 2);
        assert!(stats.cumulative_fitness.is_finite());
        assert_relative_eq!(stats.cumulative_fitness, 0.6, epsilon = 1e-12);
        assert_relative_eq!(stats.mean_fitness(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_scan_rejected() {
        let (mut tracker, registrar) = tracker(vec![]);
        tracker.seed(Pose3D::identity());

        assert!(matches!(
            tracker.update(&PointCloud::new("lidar", 0)),
            Err(LocalizationError::EmptyCloud("scan"))
        ));
        assert!(registrar.guesses.lock().unwrap().is_empty());
        assert_eq!(tracker.stats().frames, 0);
    }

    #[test]
    fn test_mean_fitness_empty() {
        assert_eq!(TrackerStats::default().mean_fitness(), 0.0);
    }
}
