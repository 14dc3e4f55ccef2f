//! Point-to-Point Iterative Closest Point (ICP) for 3D clouds.
//!
//! # Algorithm
//!
//! ```text
//! Input: Source cloud S, Target cloud T, Initial guess T₀
//! Output: Transform T* that aligns S to T
//!
//! 1. T* = T₀
//! 2. For each iteration:
//!    a. Transform S by T* and find the nearest neighbour in T for each point
//!    b. Drop pairs farther than the max correspondence distance
//!    c. Compute the optimal rigid update ΔT with SVD (Kabsch)
//!    d. T* = ΔT ∘ T*
//!    e. Stop if ΔT or the change in mean squared error is below epsilon
//! 3. Fitness = mean squared nearest-neighbour distance of all source points
//! ```

use kiddo::SquaredEuclidean;
use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

use super::{Registrar, RegistrationParams, RegistrationResult, TargetCloud};
use crate::core::types::{PointCloud, Pose3D};

/// Minimum number of pairs needed for a well-posed rigid update.
const MIN_CORRESPONDENCES: usize = 3;

/// A matched pair: transformed source point and its target neighbour.
type Correspondence = (Vector3<f64>, Vector3<f64>);

/// Point-to-Point ICP registrar.
///
/// Uses the target's k-d tree for nearest neighbour queries. Suitable when
/// the initial guess is inside the convergence basin set by the max
/// correspondence distance.
#[derive(Debug, Clone, Default)]
pub struct PointToPointIcp;

impl PointToPointIcp {
    /// Create a new ICP registrar.
    pub fn new() -> Self {
        Self
    }

    /// Find correspondences for `source` transformed by `transform`.
    fn find_correspondences(
        source: &PointCloud,
        target: &TargetCloud,
        transform: &Isometry3<f64>,
        max_dist_sq: f64,
    ) -> Vec<Correspondence> {
        let tree = target.tree();
        let mut pairs = Vec::with_capacity(source.len());

        for point in source.iter().filter(|p| p.is_finite()) {
            let p = transform
                * nalgebra::Point3::new(point.x as f64, point.y as f64, point.z as f64);
            let nearest =
                tree.nearest_one::<SquaredEuclidean>(&[p.x as f32, p.y as f32, p.z as f32]);

            if (nearest.distance as f64) <= max_dist_sq {
                let q = &target.cloud().points[nearest.item as usize];
                pairs.push((p.coords, Vector3::new(q.x as f64, q.y as f64, q.z as f64)));
            }
        }

        pairs
    }

    /// Closed-form rigid transform minimizing Σ|R·s + t − q|².
    ///
    /// Returns `None` when the SVD does not produce both factors.
    fn compute_transform(pairs: &[Correspondence]) -> Option<Isometry3<f64>> {
        let n = pairs.len() as f64;
        let (src_sum, tgt_sum) = pairs.iter().fold(
            (Vector3::<f64>::zeros(), Vector3::<f64>::zeros()),
            |(s, t), (p, q)| (s + p, t + q),
        );
        let src_centroid: Vector3<f64> = src_sum / n;
        let tgt_centroid: Vector3<f64> = tgt_sum / n;

        // H = Σ (s - s̄)(q - q̄)ᵀ
        let mut h = Matrix3::<f64>::zeros();
        for (p, q) in pairs {
            h += (p - src_centroid) * (q - tgt_centroid).transpose();
        }

        let svd = h.svd(true, true);
        let u = svd.u?;
        let v_t = svd.v_t?;

        let mut v = v_t.transpose();
        let mut r = v * u.transpose();

        // Reflection: flip the axis with the smallest singular value
        if r.determinant() < 0.0 {
            v.column_mut(2).neg_mut();
            r = v * u.transpose();
        }

        let t = tgt_centroid - r * src_centroid;
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));

        Some(Isometry3::from_parts(Translation3::from(t), rotation))
    }

    /// Mean squared error of `pairs` after applying `delta` to the source side.
    fn compute_mse(pairs: &[Correspondence], delta: &Isometry3<f64>) -> f64 {
        if pairs.is_empty() {
            return f64::MAX;
        }

        let sum: f64 = pairs
            .iter()
            .map(|(p, q)| (delta.transform_vector(p) + delta.translation.vector - q).norm_squared())
            .sum();
        sum / pairs.len() as f64
    }

    /// Fitness of `transform` and its inlier count.
    ///
    /// Fitness is the mean squared nearest-neighbour distance over every
    /// finite source point, without the correspondence cut-off, so scans
    /// pushed partly off the map score badly. Inliers are the points within
    /// `max_dist_sq`.
    fn fitness(
        source: &PointCloud,
        target: &TargetCloud,
        transform: &Isometry3<f64>,
        max_dist_sq: f64,
    ) -> (f64, usize) {
        let tree = target.tree();
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut inliers = 0usize;

        for point in source.iter().filter(|p| p.is_finite()) {
            let p = transform
                * nalgebra::Point3::new(point.x as f64, point.y as f64, point.z as f64);
            let nearest =
                tree.nearest_one::<SquaredEuclidean>(&[p.x as f32, p.y as f32, p.z as f32]);
            let q = &target.cloud().points[nearest.item as usize];
            let dist_sq = (p.coords - Vector3::new(q.x as f64, q.y as f64, q.z as f64))
                .norm_squared();

            sum += dist_sq;
            count += 1;
            if dist_sq <= max_dist_sq {
                inliers += 1;
            }
        }

        if count == 0 {
            (f64::MAX, 0)
        } else {
            (sum / count as f64, inliers)
        }
    }
}

impl Registrar for PointToPointIcp {
    fn register(
        &self,
        source: &PointCloud,
        target: &TargetCloud,
        initial_guess: &Pose3D,
        params: &RegistrationParams,
    ) -> RegistrationResult {
        if source.is_empty() || target.is_empty() {
            log::debug!(
                "ICP skipped: empty input (source {}, target {})",
                source.len(),
                target.len()
            );
            return RegistrationResult::failed(*initial_guess);
        }

        let max_dist_sq = params.max_correspondence_distance * params.max_correspondence_distance;
        let mut current = *initial_guess.isometry();
        let mut last_mse = f64::MAX;
        let mut iterations = 0u32;
        let mut converged = false;

        for iter in 0..params.max_iterations {
            iterations = iter + 1;

            let pairs = Self::find_correspondences(source, target, &current, max_dist_sq);
            if pairs.len() < MIN_CORRESPONDENCES {
                log::debug!(
                    "ICP stopped at iteration {}: only {} correspondences",
                    iterations,
                    pairs.len()
                );
                break;
            }

            let Some(delta) = Self::compute_transform(&pairs) else {
                log::debug!("ICP stopped at iteration {}: SVD failed", iterations);
                break;
            };

            current = delta * current;

            let mse = Self::compute_mse(&pairs, &delta);
            let change = delta.translation.vector.norm_squared() + delta.rotation.angle().powi(2);

            if change < params.transformation_epsilon {
                converged = true;
                break;
            }
            if (last_mse - mse).abs() < params.fitness_epsilon {
                converged = true;
                break;
            }
            last_mse = mse;
        }

        let (fitness, correspondences) = Self::fitness(source, target, &current, max_dist_sq);

        RegistrationResult {
            transform: Pose3D::from_isometry(current),
            fitness,
            converged,
            iterations,
            correspondences,
        }
    }

    fn name(&self) -> &'static str {
        "PointToPointIcp"
    }
}
