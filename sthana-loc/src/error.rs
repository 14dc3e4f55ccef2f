//! Error types for SthanaLoc

use std::time::Duration;

use thiserror::Error;

use crate::io::replay::ReplayError;
use crate::io::result_recorder::RecorderError;

/// Configuration error. Always aborts startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] basic_toml::Error),

    #[error(
        "Invalid extrinsics: expected 3 translation and 4 rotation values, got {trans} and {rot}"
    )]
    Extrinsics { trans: usize, rot: usize },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Localization pipeline error
#[derive(Error, Debug)]
pub enum LocalizationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Trace recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Input source error: {0}")]
    Source(#[from] ReplayError),

    #[error(
        "Inputs not ready after {waited:?} (map ready: {map_ready}, fix ready: {fix_ready})"
    )]
    NotReady {
        map_ready: bool,
        fix_ready: bool,
        waited: Duration,
    },

    #[error("Localization cancelled")]
    Cancelled,

    #[error("Pose tracker used before it was seeded")]
    NotSeeded,

    #[error("Empty point cloud: {0}")]
    EmptyCloud(&'static str),
}

pub type Result<T> = std::result::Result<T, LocalizationError>;
