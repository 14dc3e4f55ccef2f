//! Core localization algorithms layer.
//!
//! # Contents
//!
//! - [`matching`]: Point-set registration (3D point-to-point ICP)
//! - [`localization`]: Heading search, pose tracking and frame composition

pub mod localization;
pub mod matching;
