//! Sensor pose → vehicle pose.
//!
//! Registration estimates where the LiDAR is. The trace reports where the
//! vehicle origin (base_link) is:
//!
//! ```text
//! map_T_vehicle = map_T_lidar ∘ (vehicle_T_lidar)⁻¹
//! ```

use nalgebra::UnitQuaternion;

use crate::core::math;
use crate::core::types::{LocalizationRecord, Pose3D};
use crate::sensors::SensorExtrinsics;

/// Applies the static base_link→lidar extrinsic to sensor poses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameComposer {
    extrinsics: SensorExtrinsics,
}

impl FrameComposer {
    pub fn new(extrinsics: SensorExtrinsics) -> Self {
        Self { extrinsics }
    }

    pub fn extrinsics(&self) -> &SensorExtrinsics {
        &self.extrinsics
    }

    /// `map_to_sensor ∘ sensor_to_vehicle⁻¹`.
    ///
    /// `sensor_to_vehicle` is the base_link→lidar extrinsic.
    pub fn compose(map_to_sensor: &Pose3D, sensor_to_vehicle: &Pose3D) -> Pose3D {
        map_to_sensor.compose(&sensor_to_vehicle.inverse())
    }

    /// (yaw, pitch, roll) under the Z-Y-X convention.
    pub fn to_euler(rotation: &UnitQuaternion<f64>) -> (f64, f64, f64) {
        math::yaw_pitch_roll(rotation)
    }

    /// Inverse of [`FrameComposer::to_euler`].
    pub fn from_euler(yaw: f64, pitch: f64, roll: f64) -> UnitQuaternion<f64> {
        math::rotation_from_ypr(yaw, pitch, roll)
    }

    /// Vehicle pose in the map frame.
    pub fn vehicle_pose(&self, map_to_sensor: &Pose3D) -> Pose3D {
        Self::compose(map_to_sensor, self.extrinsics.base_to_lidar())
    }

    /// Trace record for frame `id`.
    pub fn record(&self, id: u64, map_to_sensor: &Pose3D) -> LocalizationRecord {
        let vehicle = self.vehicle_pose(map_to_sensor);
        let t = vehicle.translation();
        let (yaw, pitch, roll) = Self::to_euler(&vehicle.rotation());

        LocalizationRecord {
            id,
            x: t.x,
            y: t.y,
            z: t.z,
            yaw,
            pitch,
            roll,
        }
    }
}
