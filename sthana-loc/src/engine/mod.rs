//! Orchestration layer.
//!
//! - [`Localizer`]: Event loop driving bootstrap, tracking and outputs
//! - [`ReadinessGate`]: Map/fix barrier with timeout and cancellation

mod localizer;
mod readiness;

pub use localizer::{FrameOutput, LocalizationSummary, Localizer, LocalizerConfig};
pub use readiness::{GateSignal, Readiness, ReadinessGate, WaitPolicy};
