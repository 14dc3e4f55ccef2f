//! Scan-to-map localization.
//!
//! Tracks the pose of the LiDAR against a static prior map.
//!
//! # Components
//!
//! - [`InitialPoseEstimator`]: Recovers the heading from a position-only fix
//!   by registering the first scan at a set of candidate headings
//! - [`PoseTracker`]: Frame-to-map registration with a chained warm start
//! - [`FrameComposer`]: Sensor pose → vehicle pose, Euler extraction
//!
//! # Bootstrap
//!
//! ```text
//! fix (x, y, z) ──► guess_k = translate(x, y, z) ∘ rotZ(k·step)
//!                         │
//!                         ▼
//!                 Registrar (bootstrap params)
//!                         │
//!                         ▼
//!             lowest fitness ──► PoseTracker::seed
//! ```

mod frame_composer;
mod initial_pose;
mod pose_tracker;

pub use frame_composer::FrameComposer;
pub use initial_pose::{HeadingSearch, InitialPoseEstimate, InitialPoseEstimator};
pub use pose_tracker::{PoseTracker, PoseTrackerConfig, TrackerStats};
