//! Core data types for 3D localization.
//!
//! - [`Point`]: Single LiDAR return (x, y, z, intensity)
//! - [`PointCloud`]: Ordered points with frame id and capture timestamp
//! - [`Pose3D`]: Rigid transform (rotation + translation)
//! - [`AbsolutePositionFix`]: Position-only fix (GPS), no orientation
//! - [`LocalizationRecord`]: One row of the persisted pose trace

mod fix;
mod point;
mod pose;
mod record;

pub use fix::AbsolutePositionFix;
pub use point::{Point, PointCloud};
pub use pose::Pose3D;
pub use record::LocalizationRecord;
