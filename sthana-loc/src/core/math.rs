//! Mathematical primitives for 3D localization.
//!
//! The yaw-pitch-roll convention used for the human-readable pose trace.
//!
//! # Euler Convention
//!
//! Rotations are decomposed as intrinsic Z-Y-X:
//!
//! ```text
//! R = Rz(yaw) · Ry(pitch) · Rx(roll)
//! ```
//!
//! Yaw and roll lie in [-π, π], pitch in [-π/2, π/2]. The triple is lossy near
//! pitch = ±π/2 and must not be used for composing transforms.

use nalgebra::UnitQuaternion;

/// Decompose a rotation into (yaw, pitch, roll).
#[inline]
pub fn yaw_pitch_roll(rotation: &UnitQuaternion<f64>) -> (f64, f64, f64) {
    let (roll, pitch, yaw) = rotation.euler_angles();
    (yaw, pitch, roll)
}

/// Build a rotation from (yaw, pitch, roll) under the same convention as
/// [`yaw_pitch_roll`].
#[inline]
pub fn rotation_from_ypr(yaw: f64, pitch: f64, roll: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(roll, pitch, yaw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_pure_yaw_decomposition() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        let (yaw, pitch, roll) = yaw_pitch_roll(&rotation);

        assert_relative_eq!(yaw, 0.7, epsilon = 1e-9);
        assert_relative_eq!(pitch, 0.0, epsilon = 1e-9);
        assert_relative_eq!(roll, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ypr_matches_axis_composition() {
        // Rz(yaw) * Ry(pitch) * Rx(roll) built explicitly
        let (yaw, pitch, roll) = (0.4, -0.2, 0.1);
        let explicit = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), pitch)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), roll);

        let built = rotation_from_ypr(yaw, pitch, roll);
        assert!(built.angle_to(&explicit) < 1e-9);
    }

    #[test]
    fn test_ypr_roundtrip_grid() {
        for &yaw in &[-3.0, -1.2, 0.0, 0.9, 3.1] {
            for &pitch in &[-1.4, -0.3, 0.0, 0.6, 1.4] {
                for &roll in &[-2.5, 0.0, 0.2, 2.9] {
                    let rotation = rotation_from_ypr(yaw, pitch, roll);
                    let (y, p, r) = yaw_pitch_roll(&rotation);
                    let rebuilt = rotation_from_ypr(y, p, r);
                    assert!(
                        rebuilt.angle_to(&rotation) < 1e-9,
                        "roundtrip failed for ({yaw}, {pitch}, {roll})"
                    );
                }
            }
        }
    }
}
