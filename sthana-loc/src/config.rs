//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Values are validated when converted to runtime configs.
//!
//! ## Example TOML
//!
//! ```toml
//! [frames]
//! map_frame = "world"
//! lidar_frame = "nuscenes_lidar"
//!
//! [preprocessing]
//! scan_leaf_size = 0.3    # meters
//! map_leaf_size = 0.3
//!
//! [extrinsics]
//! baselink2lidar_trans = [0.986, 0.0, 1.84]
//! baselink2lidar_rot = [0.0, 0.0, 0.0, 1.0]   # x, y, z, w
//!
//! [output]
//! result_save_path = "result.csv"
//!
//! [initial_pose]
//! heading_range = 0.2     # radians
//! heading_step = 0.05
//! max_correspondence_distance = 2.0
//!
//! [tracking]
//! max_correspondence_distance = 1.0
//! fitness_warn_threshold = 1.0
//!
//! [readiness]
//! timeout_secs = 30.0
//! wait_log_interval_secs = 1.0
//!
//! [source]
//! map_file = "map.pcd"
//! scan_dir = "scans"
//! fix_file = "gps.csv"    # empty string: no fixes
//! ```
//!
//! Keys also accept the camelCase names used by ROS launch files
//! (`mapFrame`, `scanLeafSize`, ...).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::localization::{HeadingSearch, PoseTrackerConfig};
use crate::algorithms::matching::RegistrationParams;
use crate::engine::{LocalizerConfig, WaitPolicy};
use crate::error::ConfigError;
use crate::io::replay::ReplayConfig;
use crate::sensors::SensorExtrinsics;

/// Paths searched by [`Config::load_default`], in order.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["sthana-loc.toml", "/etc/sthana-loc.toml"];

/// Full SthanaLoc configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub frames: FramesSection,
    #[serde(default)]
    pub preprocessing: PreprocessingSection,
    #[serde(default)]
    pub extrinsics: ExtrinsicsSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub initial_pose: InitialPoseSection,
    #[serde(default)]
    pub tracking: TrackingSection,
    #[serde(default)]
    pub readiness: ReadinessSection,
    #[serde(default)]
    pub source: SourceSection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesSection {
    #[serde(alias = "mapFrame")]
    pub map_frame: String,
    #[serde(alias = "lidarFrame")]
    pub lidar_frame: String,
}

impl Default for FramesSection {
    fn default() -> Self {
        Self {
            map_frame: "world".to_string(),
            lidar_frame: "nuscenes_lidar".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingSection {
    /// Voxel size for scans (meters)
    #[serde(alias = "scanLeafSize")]
    pub scan_leaf_size: f32,
    /// Voxel size for the prior map (meters)
    #[serde(alias = "mapLeafSize")]
    pub map_leaf_size: f32,
}

impl Default for PreprocessingSection {
    fn default() -> Self {
        Self {
            scan_leaf_size: 0.3,
            map_leaf_size: 0.3,
        }
    }
}

/// base_link → lidar mounting transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrinsicsSection {
    /// x, y, z (meters)
    pub baselink2lidar_trans: Vec<f64>,
    /// Quaternion x, y, z, w
    pub baselink2lidar_rot: Vec<f64>,
}

impl Default for ExtrinsicsSection {
    fn default() -> Self {
        Self {
            baselink2lidar_trans: vec![0.0, 0.0, 0.0],
            baselink2lidar_rot: vec![0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub result_save_path: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            result_save_path: "result.csv".to_string(),
        }
    }
}

/// Heading search and its (wide basin) registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialPoseSection {
    pub heading_range: f64,
    pub heading_step: f64,
    pub max_correspondence_distance: f64,
    pub max_iterations: u32,
    pub transformation_epsilon: f64,
    pub fitness_epsilon: f64,
}

impl Default for InitialPoseSection {
    fn default() -> Self {
        let params = RegistrationParams::bootstrap();
        Self {
            heading_range: 0.2,
            heading_step: 0.05,
            max_correspondence_distance: params.max_correspondence_distance,
            max_iterations: params.max_iterations,
            transformation_epsilon: params.transformation_epsilon,
            fitness_epsilon: params.fitness_epsilon,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSection {
    pub max_correspondence_distance: f64,
    pub max_iterations: u32,
    pub transformation_epsilon: f64,
    pub fitness_epsilon: f64,
    /// Frames above this fitness are logged as low confidence (m²)
    pub fitness_warn_threshold: f64,
}

impl Default for TrackingSection {
    fn default() -> Self {
        let params = RegistrationParams::tracking();
        Self {
            max_correspondence_distance: params.max_correspondence_distance,
            max_iterations: params.max_iterations,
            transformation_epsilon: params.transformation_epsilon,
            fitness_epsilon: params.fitness_epsilon,
            fitness_warn_threshold: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSection {
    pub timeout_secs: f64,
    pub wait_log_interval_secs: f64,
}

impl Default for ReadinessSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            wait_log_interval_secs: 1.0,
        }
    }
}

/// Recorded dataset for the replay source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub map_file: String,
    pub scan_dir: String,
    pub fix_file: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            map_file: "map.pcd".to_string(),
            scan_dir: "scans".to_string(),
            fix_file: "gps.csv".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load the first file of [`DEFAULT_CONFIG_PATHS`] that exists, else
    /// defaults. Returns the path used.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Ok((Self::load(path)?, Some(path.to_path_buf())));
            }
        }
        Ok((Self::default(), None))
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Ok(basic_toml::from_str(toml)?)
    }

    /// Validated base_link→lidar extrinsics.
    pub fn extrinsics(&self) -> Result<SensorExtrinsics, ConfigError> {
        SensorExtrinsics::from_components(
            &self.extrinsics.baselink2lidar_trans,
            &self.extrinsics.baselink2lidar_rot,
        )
    }

    /// Validated runtime configuration for the localizer.
    pub fn to_localizer_config(&self) -> Result<LocalizerConfig, ConfigError> {
        let p = &self.preprocessing;
        positive("scan_leaf_size", p.scan_leaf_size as f64)?;
        positive("map_leaf_size", p.map_leaf_size as f64)?;

        let ip = &self.initial_pose;
        let bootstrap = registration_params(
            "initial_pose",
            ip.max_correspondence_distance,
            ip.max_iterations,
            ip.transformation_epsilon,
            ip.fitness_epsilon,
        )?;

        let t = &self.tracking;
        let tracking = registration_params(
            "tracking",
            t.max_correspondence_distance,
            t.max_iterations,
            t.transformation_epsilon,
            t.fitness_epsilon,
        )?;
        positive("tracking.fitness_warn_threshold", t.fitness_warn_threshold)?;

        let r = &self.readiness;
        positive("readiness.wait_log_interval_secs", r.wait_log_interval_secs)?;
        let wait = WaitPolicy {
            timeout: seconds("readiness.timeout_secs", r.timeout_secs)?,
            log_interval: seconds("readiness.wait_log_interval_secs", r.wait_log_interval_secs)?,
        };

        Ok(LocalizerConfig {
            tracker: PoseTrackerConfig {
                scan_leaf_size: p.scan_leaf_size,
                map_leaf_size: p.map_leaf_size,
                registration: tracking,
                fitness_warn_threshold: t.fitness_warn_threshold,
            },
            heading_search: HeadingSearch::new(ip.heading_range, ip.heading_step)?,
            bootstrap,
            wait,
            map_frame: self.frames.map_frame.clone(),
            lidar_frame: self.frames.lidar_frame.clone(),
        })
    }

    /// Dataset locations for the replay source.
    pub fn replay_config(&self) -> ReplayConfig {
        let fix_file = self.source.fix_file.trim();
        ReplayConfig {
            map_file: PathBuf::from(&self.source.map_file),
            scan_dir: PathBuf::from(&self.source.scan_dir),
            fix_file: (!fix_file.is_empty()).then(|| PathBuf::from(fix_file)),
            map_frame: self.frames.map_frame.clone(),
            lidar_frame: self.frames.lidar_frame.clone(),
        }
    }

    /// Trace output path.
    pub fn result_path(&self) -> PathBuf {
        PathBuf::from(&self.output.result_save_path)
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::Invalid(format!("{} = {}: {}", name, value, e)))
}

fn registration_params(
    section: &str,
    max_correspondence_distance: f64,
    max_iterations: u32,
    transformation_epsilon: f64,
    fitness_epsilon: f64,
) -> Result<RegistrationParams, ConfigError> {
    positive(
        &format!("{}.max_correspondence_distance", section),
        max_correspondence_distance,
    )?;
    if max_iterations == 0 {
        return Err(ConfigError::Invalid(format!(
            "{}.max_iterations must be at least 1",
            section
        )));
    }
    for (name, eps) in [
        ("transformation_epsilon", transformation_epsilon),
        ("fitness_epsilon", fitness_epsilon),
    ] {
        if !(eps.is_finite() && eps >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{}.{} must be non-negative, got {}",
                section, name, eps
            )));
        }
    }

    Ok(RegistrationParams {
        max_correspondence_distance,
        max_iterations,
        transformation_epsilon,
        fitness_epsilon,
    })
}
