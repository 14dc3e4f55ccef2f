//! Sensor processing layer.
//!
//! - [`preprocessing`]: Point cloud density reduction before registration
//! - [`SensorExtrinsics`]: Static vehicle→LiDAR mounting offset

mod extrinsics;
pub mod preprocessing;

pub use extrinsics::SensorExtrinsics;
