//! Absolute position fix (GPS).

use serde::{Deserialize, Serialize};

use super::Pose3D;

/// Position-only fix in the map frame.
///
/// Carries no orientation; the heading is recovered by the initial pose
/// search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsolutePositionFix {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Z position in meters
    pub z: f64,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

impl AbsolutePositionFix {
    /// Create a new fix.
    pub fn new(x: f64, y: f64, z: f64, timestamp_us: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_us,
        }
    }

    /// Pose at the fix position with the given heading.
    pub fn pose_with_heading(&self, yaw: f64) -> Pose3D {
        Pose3D::from_translation_yaw(self.x, self.y, self.z, yaw)
    }
}
