//! Point-set registration.
//!
//! Aligns a source cloud (a LiDAR scan) to a target cloud (the prior map)
//! starting from an initial transform guess.
//!
//! # Algorithms
//!
//! - [`PointToPointIcp`]: Classic Iterative Closest Point with k-d tree
//!   correspondences and a closed-form SVD update
//!
//! # Example
//!
//! ```ignore
//! use sthana_loc::algorithms::matching::{
//!     PointToPointIcp, Registrar, RegistrationParams, TargetCloud,
//! };
//!
//! let target = TargetCloud::new(map);
//! let icp = PointToPointIcp::new();
//! let params = RegistrationParams::tracking();
//!
//! let result = icp.register(&scan, &target, &initial_guess, &params);
//! println!("fitness {:.4} after {} iterations", result.fitness, result.iterations);
//! ```

mod icp;

pub use icp::PointToPointIcp;

use std::fmt;
use std::sync::OnceLock;

use kiddo::ImmutableKdTree;
use serde::{Deserialize, Serialize};

use crate::core::types::{Point, PointCloud, Pose3D};

/// Tuning values for one registration call.
///
/// Passed by reference on every call; registrars never keep mutable
/// parameter state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegistrationParams {
    /// Maximum distance between corresponding points (meters).
    ///
    /// Pairs farther apart are ignored.
    pub max_correspondence_distance: f64,

    /// Maximum number of iterations.
    pub max_iterations: u32,

    /// Convergence threshold on the incremental transform.
    ///
    /// Compared against `|Δt|² + |Δθ|²` of the last update.
    pub transformation_epsilon: f64,

    /// Convergence threshold on the change of mean squared error
    /// between two consecutive iterations.
    pub fitness_epsilon: f64,
}

impl RegistrationParams {
    /// Wide basin used while searching for the initial heading.
    pub fn bootstrap() -> Self {
        Self {
            max_correspondence_distance: 2.0,
            ..Self::tracking()
        }
    }

    /// Narrow basin used for frame-to-frame tracking.
    pub fn tracking() -> Self {
        Self {
            max_correspondence_distance: 1.0,
            max_iterations: 1000,
            transformation_epsilon: 1e-8,
            fitness_epsilon: 1e-8,
        }
    }
}

impl Default for RegistrationParams {
    fn default() -> Self {
        Self::tracking()
    }
}

/// Result of a registration call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrationResult {
    /// Refined transform mapping source points into the target frame.
    pub transform: Pose3D,

    /// Alignment residual: mean squared nearest-neighbour distance (m²)
    /// over every finite source point, with no distance cut-off.
    ///
    /// Lower is better. `f64::MAX` when the registration could not run.
    pub fitness: f64,

    /// Whether a convergence criterion was met before the iteration cap.
    pub converged: bool,

    /// Number of iterations performed.
    pub iterations: u32,

    /// Source points within the max correspondence distance at the final
    /// transform.
    pub correspondences: usize,
}

impl RegistrationResult {
    /// Failed result that hands the initial guess back unchanged.
    pub fn failed(initial_guess: Pose3D) -> Self {
        Self {
            transform: initial_guess,
            fitness: f64::MAX,
            converged: false,
            iterations: 0,
            correspondences: 0,
        }
    }
}

/// Registration target with a lazily built nearest-neighbour index.
///
/// The prior map is immutable, so the k-d tree is built once on first use
/// and shared by every later registration against the same target.
pub struct TargetCloud {
    cloud: PointCloud,
    tree: OnceLock<ImmutableKdTree<f32, 3>>,
}

impl TargetCloud {
    /// Wrap a cloud; the index is built on first query.
    pub fn new(cloud: PointCloud) -> Self {
        Self {
            cloud,
            tree: OnceLock::new(),
        }
    }

    /// Underlying cloud.
    #[inline]
    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    /// Number of target points.
    #[inline]
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    /// k-d tree over the target points (item = point index).
    ///
    /// Built with the immutable variant, which accepts any number of points
    /// sharing a coordinate (planar ground, facades, quantized maps).
    pub fn tree(&self) -> &ImmutableKdTree<f32, 3> {
        self.tree.get_or_init(|| {
            let positions: Vec<[f32; 3]> =
                self.cloud.points.iter().map(Point::as_array).collect();
            let tree = ImmutableKdTree::new_from_slice(&positions);
            log::debug!("Built k-d tree over {} target points", self.cloud.len());
            tree
        })
    }
}

impl fmt::Debug for TargetCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetCloud")
            .field("frame_id", &self.cloud.frame_id)
            .field("points", &self.cloud.len())
            .field("indexed", &self.tree.get().is_some())
            .finish()
    }
}

/// Trait for point-set registration algorithms.
pub trait Registrar: Send + Sync {
    /// Align `source` to `target`.
    ///
    /// # Arguments
    ///
    /// * `source` - The point cloud to be transformed (scan, sensor frame)
    /// * `target` - The reference point cloud (map frame)
    /// * `initial_guess` - Initial transform estimate (source frame → target frame)
    /// * `params` - Correspondence distance, iteration cap and epsilons
    ///
    /// # Returns
    ///
    /// The refined transform and its fitness. Implementations never panic on
    /// degenerate input; they return [`RegistrationResult::failed`].
    fn register(
        &self,
        source: &PointCloud,
        target: &TargetCloud,
        initial_guess: &Pose3D,
        params: &RegistrationParams,
    ) -> RegistrationResult;

    /// Name of this registrar for logging.
    fn name(&self) -> &'static str;
}
