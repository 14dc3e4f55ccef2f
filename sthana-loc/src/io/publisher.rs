//! Outbound localization results.
//!
//! Per processed frame the localizer emits the scan re-expressed in the map
//! frame, the LiDAR pose and the lidar←map transform. Where they go (a
//! middleware, a visualizer, a test) is up to the [`PosePublisher`].

use crossbeam_channel::Sender;

use crate::core::types::{PointCloud, Pose3D};

/// Pose with frame and time.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseStamped {
    pub frame_id: String,
    pub timestamp_us: u64,
    pub pose: Pose3D,
}

/// Transform from `parent_frame` to `child_frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStamped {
    pub parent_frame: String,
    pub child_frame: String,
    pub timestamp_us: u64,
    pub transform: Pose3D,
}

/// Everything a publisher can receive, as one value.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMessage {
    Cloud(PointCloud),
    Pose(PoseStamped),
    Transform(TransformStamped),
}

/// Sink for localization outputs.
///
/// Publishing is best effort: failures are logged by the implementation and
/// never stop tracking.
pub trait PosePublisher: Send {
    /// Scan registered into the map frame.
    fn publish_cloud(&mut self, cloud: &PointCloud);

    /// LiDAR pose in the map frame.
    fn publish_pose(&mut self, pose: &PoseStamped);

    /// Frame transform broadcast.
    fn broadcast_transform(&mut self, transform: &TransformStamped);
}

/// Publisher that only logs.
#[derive(Debug, Default)]
pub struct LogPublisher {
    poses: u64,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poses published so far.
    pub fn poses(&self) -> u64 {
        self.poses
    }
}

impl PosePublisher for LogPublisher {
    fn publish_cloud(&mut self, cloud: &PointCloud) {
        log::trace!(
            "Cloud [{}] @ {}: {} points",
            cloud.frame_id,
            cloud.timestamp_us,
            cloud.len()
        );
    }

    fn publish_pose(&mut self, pose: &PoseStamped) {
        self.poses += 1;
        let t = pose.pose.translation();
        let (yaw, _, _) = pose.pose.yaw_pitch_roll();
        log::debug!(
            "Pose [{}] @ {}: ({:.3}, {:.3}, {:.3}) yaw {:.3}",
            pose.frame_id,
            pose.timestamp_us,
            t.x,
            t.y,
            t.z,
            yaw
        );
    }

    fn broadcast_transform(&mut self, transform: &TransformStamped) {
        log::trace!(
            "Transform {} -> {} @ {}",
            transform.parent_frame,
            transform.child_frame,
            transform.timestamp_us
        );
    }
}

/// Publisher forwarding every output into a channel.
///
/// A disconnected receiver is logged once; later outputs are dropped.
pub struct ChannelPublisher {
    tx: Sender<OutputMessage>,
    disconnected: bool,
}

impl ChannelPublisher {
    pub fn new(tx: Sender<OutputMessage>) -> Self {
        Self {
            tx,
            disconnected: false,
        }
    }

    fn forward(&mut self, msg: OutputMessage) {
        if self.disconnected {
            return;
        }
        if self.tx.send(msg).is_err() {
            log::warn!("Output receiver disconnected, dropping further outputs");
            self.disconnected = true;
        }
    }
}

impl PosePublisher for ChannelPublisher {
    fn publish_cloud(&mut self, cloud: &PointCloud) {
        self.forward(OutputMessage::Cloud(cloud.clone()));
    }

    fn publish_pose(&mut self, pose: &PoseStamped) {
        self.forward(OutputMessage::Pose(pose.clone()));
    }

    fn broadcast_transform(&mut self, transform: &TransformStamped) {
        self.forward(OutputMessage::Transform(transform.clone()));
    }
}
