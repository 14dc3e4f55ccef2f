//! Rigid 3D transform.

use nalgebra::{
    Isometry3, Matrix3, Matrix4, Point3, Quaternion, Rotation3, Translation3, UnitQuaternion,
    Vector3,
};

use super::Point;
use crate::core::math;

/// Rigid transform (rotation + translation) between two reference frames.
///
/// Used for map→sensor, map→vehicle and vehicle→sensor relationships.
/// Composition follows the usual frame-chaining rule:
///
/// ```text
/// map_T_vehicle = map_T_sensor ∘ sensor_T_vehicle
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose3D {
    iso: Isometry3<f64>,
}

impl Pose3D {
    /// Identity transform.
    #[inline]
    pub fn identity() -> Self {
        Self {
            iso: Isometry3::identity(),
        }
    }

    /// Build from a translation vector and a rotation.
    #[inline]
    pub fn new(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self {
            iso: Isometry3::from_parts(Translation3::from(translation), rotation),
        }
    }

    /// Wrap an existing isometry.
    #[inline]
    pub fn from_isometry(iso: Isometry3<f64>) -> Self {
        Self { iso }
    }

    /// `translate(x, y, z) ∘ rotZ(yaw)`: a position with a heading only.
    pub fn from_translation_yaw(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self::new(
            Vector3::new(x, y, z),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw),
        )
    }

    /// Build from a translation and yaw/pitch/roll (Z-Y-X convention).
    pub fn from_xyz_ypr(x: f64, y: f64, z: f64, yaw: f64, pitch: f64, roll: f64) -> Self {
        Self::new(
            Vector3::new(x, y, z),
            math::rotation_from_ypr(yaw, pitch, roll),
        )
    }

    /// Build from a translation and quaternion components `(x, y, z, w)`.
    ///
    /// The quaternion is normalized.
    pub fn from_translation_quaternion(translation: [f64; 3], quaternion: [f64; 4]) -> Self {
        let [qx, qy, qz, qw] = quaternion;
        Self::new(
            Vector3::from(translation),
            UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz)),
        )
    }

    /// Build from a 4×4 homogeneous matrix.
    ///
    /// The upper-left block is projected onto the closest rotation, so small
    /// numerical drift in the input is tolerated.
    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let rotation = Rotation3::from_matrix(&r);
        Self::new(
            Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]),
            UnitQuaternion::from_rotation_matrix(&rotation),
        )
    }

    /// 4×4 homogeneous matrix.
    #[inline]
    pub fn to_matrix(&self) -> Matrix4<f64> {
        self.iso.to_homogeneous()
    }

    /// Underlying isometry.
    #[inline]
    pub fn isometry(&self) -> &Isometry3<f64> {
        &self.iso
    }

    /// Translation component.
    #[inline]
    pub fn translation(&self) -> Vector3<f64> {
        self.iso.translation.vector
    }

    /// Rotation component.
    #[inline]
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.iso.rotation
    }

    /// Quaternion components as `(x, y, z, w)`.
    pub fn quaternion_xyzw(&self) -> [f64; 4] {
        let q = self.iso.rotation.quaternion();
        [q.i, q.j, q.k, q.w]
    }

    /// Compose two transforms: `self ∘ other`.
    ///
    /// Applies `other` first, then `self`.
    #[inline]
    pub fn compose(&self, other: &Pose3D) -> Pose3D {
        Self {
            iso: self.iso * other.iso,
        }
    }

    /// Inverse transform.
    #[inline]
    pub fn inverse(&self) -> Pose3D {
        Self {
            iso: self.iso.inverse(),
        }
    }

    /// Transform a point; intensity is carried over.
    #[inline]
    pub fn transform_point(&self, point: &Point) -> Point {
        let p = self.iso.transform_point(&Point3::new(
            point.x as f64,
            point.y as f64,
            point.z as f64,
        ));
        Point::new(p.x as f32, p.y as f32, p.z as f32, point.intensity)
    }

    /// Rotation as (yaw, pitch, roll).
    #[inline]
    pub fn yaw_pitch_roll(&self) -> (f64, f64, f64) {
        math::yaw_pitch_roll(&self.iso.rotation)
    }

    /// Euclidean distance between the translations of two poses.
    pub fn translation_distance(&self, other: &Pose3D) -> f64 {
        (self.translation() - other.translation()).norm()
    }

    /// Angle of the relative rotation between two poses (radians).
    pub fn rotation_distance(&self, other: &Pose3D) -> f64 {
        self.iso.rotation.angle_to(&other.iso.rotation)
    }
}

impl Default for Pose3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Isometry3<f64>> for Pose3D {
    fn from(iso: Isometry3<f64>) -> Self {
        Self::from_isometry(iso)
    }
}
