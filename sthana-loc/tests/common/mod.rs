//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use nalgebra::Vector3;
use sthana_loc::{
    Point, PointCloud, Pose3D, Registrar, RegistrationParams, RegistrationResult, TargetCloud,
};

/// Deterministic offset in (-scale, scale), standing in for range noise.
pub fn jitter(i: usize, axis: u32, scale: f32) -> f32 {
    let mut h = (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (axis as u64 + 1).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 31;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 29;
    let unit = (h >> 40) as f32 / (1u64 << 24) as f32;
    (unit * 2.0 - 1.0) * scale
}

/// Synthetic street: ground, two building fronts, an end wall and a few
/// poles and a kiosk so the scene has no symmetry.
///
/// Spacing is 0.5 m; covers x ∈ [0, 30), y ∈ [-5, 15). Points carry 1 cm
/// of deterministic noise.
pub fn street_map() -> PointCloud {
    street(0.01)
}

/// [`street_map`] on the exact grid: the ground shares z = 0 and each wall
/// shares one coordinate, as in surveyed or quantized maps.
pub fn street_map_exact() -> PointCloud {
    street(0.0)
}

fn street(noise: f32) -> PointCloud {
    let mut raw: Vec<(f32, f32, f32)> = Vec::new();

    for ix in 0..60 {
        for iy in 0..40 {
            raw.push((ix as f32 * 0.5, -5.0 + iy as f32 * 0.5, 0.0));
        }
    }
    for ix in 0..60 {
        for h in 1..9 {
            raw.push((ix as f32 * 0.5, -5.0, h as f32 * 0.5));
            if ix < 40 {
                raw.push((ix as f32 * 0.5, 15.0, h as f32 * 0.5));
            }
        }
    }
    for iy in 0..40 {
        for h in 1..9 {
            raw.push((30.0, -5.0 + iy as f32 * 0.5, h as f32 * 0.5));
        }
    }
    for (px, py) in [(6.0, 1.0), (14.0, 9.5), (21.0, 2.5)] {
        for h in 1..12 {
            raw.push((px, py, h as f32 * 0.3));
        }
    }
    for ix in 0..6 {
        for iy in 0..4 {
            raw.push((17.0 + ix as f32 * 0.5, 6.0 + iy as f32 * 0.5, 2.5));
        }
    }

    let points = raw
        .into_iter()
        .enumerate()
        .map(|(i, (x, y, z))| {
            let (dx, dy, dz) = if noise > 0.0 {
                (jitter(i, 0, noise), jitter(i, 1, noise), jitter(i, 2, noise))
            } else {
                (0.0, 0.0, 0.0)
            };
            Point::new(x + dx, y + dy, z + dz, (i % 100) as f32)
        })
        .collect();

    PointCloud::from_points(points, "world", 0)
}

/// Scan taken by a LiDAR at `map_to_lidar`: map points within `radius`,
/// expressed in the sensor frame.
pub fn scan_at(map: &PointCloud, map_to_lidar: &Pose3D, radius: f64, timestamp_us: u64) -> PointCloud {
    let origin = map_to_lidar.translation();
    let nearby: Vec<Point> = map
        .iter()
        .filter(|p| {
            let d = Vector3::new(p.x as f64, p.y as f64, p.z as f64) - origin;
            d.norm() <= radius
        })
        .copied()
        .collect();

    PointCloud::from_points(nearby, "nuscenes_lidar", timestamp_us)
        .transformed(&map_to_lidar.inverse())
}

/// Small cloud for tests that never reach a real registrar.
pub fn tiny_cloud(frame: &str, timestamp_us: u64) -> PointCloud {
    PointCloud::from_points(
        vec![
            Point::xyz(0.0, 0.0, 0.0),
            Point::xyz(1.0, 0.0, 0.0),
            Point::xyz(0.0, 1.0, 0.0),
            Point::xyz(0.0, 0.0, 1.0),
        ],
        frame,
        timestamp_us,
    )
}

/// Registrar stand-in with scripted fitness values.
///
/// Call `n` returns the guess raised by `n · 0.01` m in z, so every
/// candidate's output is distinguishable. Calls past the script reuse
/// `default_fitness`.
pub struct ScriptedRegistrar {
    fitness: Vec<f64>,
    default_fitness: f64,
    calls: Mutex<Vec<Pose3D>>,
}

impl ScriptedRegistrar {
    pub fn new(fitness: Vec<f64>) -> Self {
        Self {
            fitness,
            default_fitness: 0.1,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Registrar returning `fitness` on every call.
    pub fn constant(fitness: f64) -> Self {
        Self {
            fitness: Vec::new(),
            default_fitness: fitness,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Initial guesses received so far.
    pub fn guesses(&self) -> Vec<Pose3D> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Registrar for ScriptedRegistrar {
    fn register(
        &self,
        _source: &PointCloud,
        _target: &TargetCloud,
        initial_guess: &Pose3D,
        _params: &RegistrationParams,
    ) -> RegistrationResult {
        let mut calls = self.calls.lock().unwrap();
        let n = calls.len();
        calls.push(*initial_guess);

        let fitness = self.fitness.get(n).copied().unwrap_or(self.default_fitness);
        let lifted = Pose3D::new(
            initial_guess.translation() + Vector3::new(0.0, 0.0, n as f64 * 0.01),
            initial_guess.rotation(),
        );

        RegistrationResult {
            transform: lifted,
            fitness,
            converged: true,
            iterations: 1,
            correspondences: 4,
        }
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }
}
