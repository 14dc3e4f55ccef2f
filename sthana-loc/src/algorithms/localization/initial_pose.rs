//! Initial pose estimation from a position-only fix.
//!
//! A GPS fix gives the position but no heading. The first scan is
//! registered against the map once per candidate heading and the candidate
//! with the lowest fitness wins.

use std::sync::Arc;

use crate::algorithms::matching::{Registrar, RegistrationParams, TargetCloud};
use crate::core::types::{AbsolutePositionFix, PointCloud, Pose3D};
use crate::error::{ConfigError, LocalizationError, Result};

/// Tolerance absorbing float error when `range` is a multiple of `step`.
const CANDIDATE_EPSILON: f64 = 1e-9;

/// Bounded set of candidate headings `k · step` for `k = 0..=n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingSearch {
    range: f64,
    step: f64,
}

impl HeadingSearch {
    /// Create a search over `[0, range]` in increments of `step` (radians).
    ///
    /// Both values must be finite and positive.
    pub fn new(range: f64, step: f64) -> std::result::Result<Self, ConfigError> {
        if !(range.is_finite() && range > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "heading_range must be positive, got {}",
                range
            )));
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "heading_step must be positive, got {}",
                step
            )));
        }
        Ok(Self { range, step })
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Candidate headings in evaluation order. Always starts with 0.
    ///
    /// The end point is included when `range` is a multiple of `step`.
    pub fn candidates(&self) -> Vec<f64> {
        let n = (self.range / self.step + CANDIDATE_EPSILON).floor() as usize;
        (0..=n).map(|k| k as f64 * self.step).collect()
    }
}

impl Default for HeadingSearch {
    fn default() -> Self {
        Self {
            range: 0.2,
            step: 0.05,
        }
    }
}

/// Outcome of the heading search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialPoseEstimate {
    /// Refined map→sensor transform of the winning candidate
    pub pose: Pose3D,
    /// Candidate heading that produced it (radians)
    pub heading: f64,
    /// Fitness of the winning registration
    pub fitness: f64,
    /// Number of candidates registered
    pub candidates_evaluated: usize,
}

/// Heading search over a fixed candidate set.
pub struct InitialPoseEstimator {
    registrar: Arc<dyn Registrar>,
}

impl InitialPoseEstimator {
    pub fn new(registrar: Arc<dyn Registrar>) -> Self {
        Self { registrar }
    }

    /// Register `scan` against `map` at every candidate heading around `fix`.
    ///
    /// Selects the strictly lowest fitness; ties keep the earliest candidate.
    /// `scan` is expected to be downsampled already.
    pub fn estimate(
        &self,
        fix: &AbsolutePositionFix,
        map: &TargetCloud,
        scan: &PointCloud,
        search: &HeadingSearch,
        params: &RegistrationParams,
    ) -> Result<InitialPoseEstimate> {
        if map.is_empty() {
            return Err(LocalizationError::EmptyCloud("map"));
        }
        if scan.is_empty() {
            return Err(LocalizationError::EmptyCloud("scan"));
        }

        let candidates = search.candidates();
        log::info!(
            "Initial pose search at ({:.2}, {:.2}, {:.2}): {} headings, {}",
            fix.x,
            fix.y,
            fix.z,
            candidates.len(),
            self.registrar.name()
        );

        let mut best: Option<InitialPoseEstimate> = None;

        for &heading in &candidates {
            let guess = fix.pose_with_heading(heading);
            let result = self.registrar.register(scan, map, &guess, params);

            log::info!(
                "  heading {:.3} rad: fitness {:.6} (converged: {}, iterations: {})",
                heading,
                result.fitness,
                result.converged,
                result.iterations
            );

            let better = best.is_none_or(|b| result.fitness < b.fitness);
            if better {
                best = Some(InitialPoseEstimate {
                    pose: result.transform,
                    heading,
                    fitness: result.fitness,
                    candidates_evaluated: 0,
                });
            }
        }

        // Non-empty: HeadingSearch always yields the 0 heading
        let mut estimate = best.ok_or(LocalizationError::Config(ConfigError::Invalid(
            "heading search produced no candidates".to_string(),
        )))?;
        estimate.candidates_evaluated = candidates.len();

        let t = estimate.pose.translation();
        log::info!(
            "Initial pose: ({:.3}, {:.3}, {:.3}), heading {:.3} rad, fitness {:.6}",
            t.x,
            t.y,
            t.z,
            estimate.heading,
            estimate.fitness
        );

        Ok(estimate)
    }
}
