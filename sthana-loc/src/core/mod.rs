//! Core foundation layer.
//!
//! This is the bottom layer of the localization stack with no internal
//! dependencies. All other layers depend on core.
//!
//! # Contents
//!
//! - [`types`]: Core data types (points, clouds, poses, fixes, trace records)
//! - [`math`]: Angle normalization and Euler angle conversion

pub mod math;
pub mod types;
