//! I/O and infrastructure layer.
//!
//! # Contents
//!
//! - [`transport`]: Inbound event channel (map, scans, fixes, shutdown)
//! - [`publisher`]: Outbound poses, transforms and registered clouds
//! - [`result_recorder`]: CSV pose trace
//! - [`pcd`]: PCD point cloud file reader/writer
//! - [`replay`]: Streams a recorded dataset into the event channel

pub mod pcd;
pub mod publisher;
pub mod replay;
pub mod result_recorder;
pub mod transport;
