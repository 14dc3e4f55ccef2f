//! SthanaLoc - LiDAR localization against a static prior map
//!
//! Tracks the pose of a vehicle by registering every incoming LiDAR scan
//! against a pre-built point cloud map. A position-only fix (GPS) seeds the
//! first estimate; the heading is recovered by a bounded search.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main                           │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │            (localizer, readiness gate)              │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │     (transport, publisher, trace recorder, pcd)     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │   (ICP registration, heading search, pose tracking) │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │         (voxel downsampling, extrinsics)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! ```text
//! PriorMap + first scan + GPS fix
//!         │
//!         ▼
//! InitialPoseEstimator ──► seed transform
//!         │
//!         ▼
//! PoseTracker (per scan: downsample → register → warm start)
//!         │
//!         ▼
//! FrameComposer ──► ResultRecorder (CSV trace)
//!               └─► PosePublisher (cloud, pose, transform)
//! ```

// Layer 1: Core foundation (no internal deps)
pub mod core;

// Layer 2: Sensor processing (depends on core)
pub mod sensors;

// Layer 3: Algorithms (depends on core, sensors)
pub mod algorithms;

// Layer 4: I/O infrastructure (depends on core, algorithms)
pub mod io;

// Layer 5: Orchestration (depends on all layers)
pub mod engine;

// Cross-cutting
pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::math;
pub use core::types::{AbsolutePositionFix, LocalizationRecord, Point, PointCloud, Pose3D};

// Sensors
pub use sensors::SensorExtrinsics;
pub use sensors::preprocessing::{Downsampler, VoxelGridDownsampler};

// Algorithms - Matching
pub use algorithms::matching::{
    PointToPointIcp, Registrar, RegistrationParams, RegistrationResult, TargetCloud,
};

// Algorithms - Localization
pub use algorithms::localization::{
    FrameComposer, HeadingSearch, InitialPoseEstimate, InitialPoseEstimator, PoseTracker,
    PoseTrackerConfig, TrackerStats,
};

// I/O
pub use io::publisher::{
    ChannelPublisher, LogPublisher, OutputMessage, PosePublisher, PoseStamped, TransformStamped,
};
pub use io::result_recorder::{RecorderError, RecorderSummary, ResultRecorder, TRACE_HEADER};
pub use io::transport::{EventReceiver, EventSender, LocalizerEvent, create_event_channel};

// Engine
pub use engine::{
    FrameOutput, LocalizationSummary, Localizer, LocalizerConfig, Readiness, ReadinessGate,
    WaitPolicy,
};

// Configuration and errors
pub use config::Config;
pub use error::{ConfigError, LocalizationError};
