//! Persisted pose trace record.

use serde::{Deserialize, Serialize};

/// One row of the localization trace.
///
/// Position is the vehicle origin in the map frame; orientation is the
/// yaw-pitch-roll decomposition (radians) used for human inspection only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalizationRecord {
    /// Sequence id, starting at 1
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl LocalizationRecord {
    /// Comma-delimited row matching [`crate::io::result_recorder::TRACE_HEADER`].
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.id, self.x, self.y, self.z, self.yaw, self.pitch, self.roll
        )
    }
}
