//! Point and point cloud types for 3D LiDAR data.

use serde::{Deserialize, Serialize};

use super::Pose3D;

/// A single range-sensor return.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
    /// Z coordinate in meters
    pub z: f32,
    /// Return intensity (sensor specific units)
    pub intensity: f32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, intensity: f32) -> Self {
        Self { x, y, z, intensity }
    }

    /// Create a point with zero intensity.
    #[inline]
    pub fn xyz(x: f32, y: f32, z: f32) -> Self {
        Self::new(x, y, z, 0.0)
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// True when all coordinates are finite (no NaN / inf returns).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Coordinates as an array, for k-d tree queries.
    #[inline]
    pub fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Ordered collection of points captured in one frame.
///
/// Clouds are treated as immutable once captured: operations such as
/// [`PointCloud::transformed`] return a new cloud and keep the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    /// Points in capture order
    pub points: Vec<Point>,
    /// Reference frame the points are expressed in
    pub frame_id: String,
    /// Capture timestamp in microseconds
    pub timestamp_us: u64,
}

impl PointCloud {
    /// Create an empty cloud.
    pub fn new(frame_id: impl Into<String>, timestamp_us: u64) -> Self {
        Self {
            points: Vec::new(),
            frame_id: frame_id.into(),
            timestamp_us,
        }
    }

    /// Create a cloud from existing points.
    pub fn from_points(points: Vec<Point>, frame_id: impl Into<String>, timestamp_us: u64) -> Self {
        Self {
            points,
            frame_id: frame_id.into(),
            timestamp_us,
        }
    }

    /// New cloud with the same frame and timestamp but different points.
    pub fn with_points(&self, points: Vec<Point>) -> Self {
        Self {
            points,
            frame_id: self.frame_id.clone(),
            timestamp_us: self.timestamp_us,
        }
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over points.
    pub fn iter(&self) -> impl Iterator<Item = &Point> + '_ {
        self.points.iter()
    }

    /// Mean position of all points, or `None` if empty.
    pub fn centroid(&self) -> Option<Point> {
        if self.points.is_empty() {
            return None;
        }

        let n = self.points.len() as f64;
        let (mut sx, mut sy, mut sz, mut si) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for p in &self.points {
            sx += p.x as f64;
            sy += p.y as f64;
            sz += p.z as f64;
            si += p.intensity as f64;
        }

        Some(Point::new(
            (sx / n) as f32,
            (sy / n) as f32,
            (sz / n) as f32,
            (si / n) as f32,
        ))
    }

    /// Apply a rigid transform to every point.
    ///
    /// Frame id and timestamp are carried over; callers relabel the frame
    /// when re-expressing the cloud elsewhere.
    pub fn transformed(&self, pose: &Pose3D) -> PointCloud {
        self.with_points(self.points.iter().map(|p| pose.transform_point(p)).collect())
    }
}
