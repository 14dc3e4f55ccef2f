//! Dataset replay.
//!
//! Streams a recorded drive into the localizer event channel:
//!
//! ```text
//! fix_file (CSV) ──► Fix events
//! map_file (PCD) ──► Map event
//! scan_dir/*.pcd ──► Scan events (sorted by file name)
//!                ──► Shutdown
//! ```
//!
//! Scan timestamps come from the file stem when it is numeric
//! (`1533151603512404.pcd`), else from the sequence index.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use super::pcd::{self, PcdError};
use super::transport::{EventSender, LocalizerEvent};
use crate::core::types::{AbsolutePositionFix, PointCloud};

/// Error type for dataset loading.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load point cloud: {0}")]
    Pcd(#[from] PcdError),

    #[error("{path}:{line}: {reason}")]
    Fix {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("No .pcd scans found in {0}")]
    NoScans(PathBuf),
}

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Dataset locations and frame labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub map_file: PathBuf,
    pub scan_dir: PathBuf,
    /// Optional: without fixes the localizer times out waiting for one.
    pub fix_file: Option<PathBuf>,
    pub map_frame: String,
    pub lidar_frame: String,
}

/// Loaded dataset, ready to stream.
///
/// The map and fixes are read eagerly so a broken dataset fails before the
/// pipeline starts; scans are read one at a time on the replay thread.
#[derive(Debug)]
pub struct ReplaySource {
    map: PointCloud,
    fixes: Vec<AbsolutePositionFix>,
    scans: Vec<(u64, PathBuf)>,
    lidar_frame: String,
}

impl ReplaySource {
    /// Load the map and fixes and index the scan directory.
    pub fn open(config: &ReplayConfig) -> Result<Self> {
        let map = pcd::read_pcd(&config.map_file, &config.map_frame, 0)?;
        log::info!(
            "Loaded map {} ({} points)",
            config.map_file.display(),
            map.len()
        );

        let fixes = match &config.fix_file {
            Some(path) => read_fixes(path)?,
            None => Vec::new(),
        };

        let scans = list_scans(&config.scan_dir)?;
        log::info!(
            "Replay: {} scans from {}, {} fixes",
            scans.len(),
            config.scan_dir.display(),
            fixes.len()
        );

        Ok(Self {
            map,
            fixes,
            scans,
            lidar_frame: config.lidar_frame.clone(),
        })
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    pub fn fixes(&self) -> &[AbsolutePositionFix] {
        &self.fixes
    }

    /// Stream the dataset on a `replay` thread.
    ///
    /// Stops early when `running` clears or the receiver is gone. Unreadable
    /// scans are logged and skipped.
    pub fn spawn(self, tx: EventSender, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("replay".into())
            .spawn(move || self.stream(&tx, &running))
    }

    fn stream(self, tx: &EventSender, running: &AtomicBool) {
        log::info!("Replay thread starting");

        let Self {
            map,
            fixes,
            scans,
            lidar_frame,
        } = self;

        let head = fixes
            .into_iter()
            .map(LocalizerEvent::Fix)
            .chain(std::iter::once(LocalizerEvent::Map(map)));
        for event in head {
            if !running.load(Ordering::Relaxed) || tx.send(event).is_err() {
                log::info!("Replay stopped before streaming scans");
                return;
            }
        }

        let mut sent = 0usize;
        for (timestamp_us, path) in &scans {
            if !running.load(Ordering::Relaxed) {
                break;
            }

            let scan = match pcd::read_pcd(path, &lidar_frame, *timestamp_us) {
                Ok(scan) => scan,
                Err(e) => {
                    log::warn!("Skipping scan {}: {}", path.display(), e);
                    continue;
                }
            };

            if tx.send(LocalizerEvent::Scan(scan)).is_err() {
                log::info!("Localizer gone, stopping replay");
                return;
            }
            sent += 1;
        }

        log::info!("Replay finished: {}/{} scans sent", sent, scans.len());
        let _ = tx.send(LocalizerEvent::Shutdown);
    }
}

/// Sorted `*.pcd` files of `dir` with their timestamps.
fn list_scans(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let io_err = |source| ReplayError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pcd")) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(ReplayError::NoScans(dir.to_path_buf()));
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let ts = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(i as u64);
            (ts, path)
        })
        .collect())
}

/// Read fixes from a CSV file with rows `timestamp_us,x,y,z`.
///
/// A non-numeric first row is treated as a header. Blank lines and lines
/// starting with `#` are skipped.
pub fn read_fixes<P: AsRef<Path>>(path: P) -> Result<Vec<AbsolutePositionFix>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut fixes = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let fail = |reason: String| ReplayError::Fix {
            path: path.to_path_buf(),
            line: i + 1,
            reason,
        };

        if fields.len() != 4 {
            return Err(fail(format!("expected 4 columns, got {}", fields.len())));
        }

        let Ok(timestamp_us) = fields[0].parse::<u64>() else {
            if fixes.is_empty() && i == 0 {
                continue; // header
            }
            return Err(fail(format!("invalid timestamp '{}'", fields[0])));
        };

        let mut xyz = [0.0f64; 3];
        for (slot, field) in xyz.iter_mut().zip(&fields[1..]) {
            *slot = field
                .parse()
                .map_err(|_| fail(format!("invalid coordinate '{}'", field)))?;
        }

        fixes.push(AbsolutePositionFix::new(xyz[0], xyz[1], xyz[2], timestamp_us));
    }

    Ok(fixes)
}
