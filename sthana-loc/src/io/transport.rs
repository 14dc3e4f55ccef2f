//! Inbound event channel.
//!
//! Producers (a dataset replay, a middleware bridge, tests) push
//! [`LocalizerEvent`]s; the localizer consumes them in arrival order on a
//! single thread.

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::core::types::{AbsolutePositionFix, PointCloud};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Message delivered to the localizer.
#[derive(Debug, Clone)]
pub enum LocalizerEvent {
    /// Prior map. Only the first one is used.
    Map(PointCloud),
    /// LiDAR scan in the sensor frame.
    Scan(PointCloud),
    /// Absolute position fix. Only the first one seeds the bootstrap.
    Fix(AbsolutePositionFix),
    /// Stop after the in-flight frame.
    Shutdown,
}

impl LocalizerEvent {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            LocalizerEvent::Map(_) => "map",
            LocalizerEvent::Scan(_) => "scan",
            LocalizerEvent::Fix(_) => "fix",
            LocalizerEvent::Shutdown => "shutdown",
        }
    }
}

/// Sender half of the event channel.
pub type EventSender = Sender<LocalizerEvent>;

/// Receiver half of the event channel.
pub type EventReceiver = Receiver<LocalizerEvent>;

/// Create a bounded event channel.
///
/// Senders block while the channel is full. Capacity is at least 1.
pub fn create_event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    bounded(capacity.max(1))
}
