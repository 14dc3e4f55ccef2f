//! Static LiDAR mounting offset.

use crate::core::types::Pose3D;
use crate::error::ConfigError;

/// Fixed transform from the vehicle reference frame (base_link) to the
/// LiDAR frame.
///
/// Supplied once at startup and never modified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorExtrinsics {
    base_to_lidar: Pose3D,
}

impl SensorExtrinsics {
    /// Wrap an existing base_link→lidar transform.
    pub fn new(base_to_lidar: Pose3D) -> Self {
        Self { base_to_lidar }
    }

    /// Sensor mounted at the vehicle origin.
    pub fn identity() -> Self {
        Self::new(Pose3D::identity())
    }

    /// Build from the `baselink2lidar_trans` / `baselink2lidar_rot` lists.
    ///
    /// `trans` must hold exactly 3 values (x, y, z) and `rot` exactly 4
    /// (quaternion x, y, z, w). The quaternion is normalized; a zero or
    /// non-finite quaternion is rejected.
    pub fn from_components(trans: &[f64], rot: &[f64]) -> Result<Self, ConfigError> {
        let (Ok(t), Ok(q)) = (<[f64; 3]>::try_from(trans), <[f64; 4]>::try_from(rot)) else {
            return Err(ConfigError::Extrinsics {
                trans: trans.len(),
                rot: rot.len(),
            });
        };

        if t.iter().chain(q.iter()).any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid(
                "extrinsics contain non-finite values".to_string(),
            ));
        }

        let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm < 1e-9 {
            return Err(ConfigError::Invalid(
                "baselink2lidar_rot is a zero quaternion".to_string(),
            ));
        }

        Ok(Self::new(Pose3D::from_translation_quaternion(t, q)))
    }

    /// base_link→lidar transform.
    #[inline]
    pub fn base_to_lidar(&self) -> &Pose3D {
        &self.base_to_lidar
    }
}

impl Default for SensorExtrinsics {
    fn default() -> Self {
        Self::identity()
    }
}
