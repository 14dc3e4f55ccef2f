//! Localization event loop.
//!
//! Consumes [`LocalizerEvent`]s on the calling thread:
//!
//! ```text
//! Map  ──► downsample once, build PoseTracker          ─┐
//! Fix  ──► remember first fix, announce bootstrap pose ─┴─► ReadinessGate
//! Scan ──► (wait for gate) ──► bootstrap on first frame
//!                          ──► track ──► record ──► publish
//! Shutdown / running=false / disconnect ──► finish trace, summary
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::readiness::{GateSignal, Readiness, ReadinessGate, WaitPolicy};
use crate::algorithms::localization::{
    FrameComposer, HeadingSearch, InitialPoseEstimate, InitialPoseEstimator, PoseTracker,
    PoseTrackerConfig, TrackerStats,
};
use crate::algorithms::matching::{Registrar, RegistrationParams, RegistrationResult};
use crate::core::types::{AbsolutePositionFix, LocalizationRecord, PointCloud, Pose3D};
use crate::error::{LocalizationError, Result};
use crate::io::publisher::{PosePublisher, PoseStamped, TransformStamped};
use crate::io::result_recorder::{RecorderSummary, ResultRecorder};
use crate::io::transport::LocalizerEvent;
use crate::sensors::SensorExtrinsics;
use crate::sensors::preprocessing::Downsampler;

/// Receive timeout while idle, bounds the latency of a cleared running flag.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Runtime configuration of the localizer.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizerConfig {
    pub tracker: PoseTrackerConfig,
    pub heading_search: HeadingSearch,
    /// Registration parameters for the heading search.
    pub bootstrap: RegistrationParams,
    pub wait: WaitPolicy,
    pub map_frame: String,
    pub lidar_frame: String,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            tracker: PoseTrackerConfig::default(),
            heading_search: HeadingSearch::default(),
            bootstrap: RegistrationParams::bootstrap(),
            wait: WaitPolicy::default(),
            map_frame: "world".to_string(),
            lidar_frame: "nuscenes_lidar".to_string(),
        }
    }
}

/// Per-frame output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    pub record: LocalizationRecord,
    pub registration: RegistrationResult,
}

/// End-of-run report.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizationSummary {
    /// Frames written to the trace
    pub frames: u64,
    pub cumulative_fitness: f64,
    pub mean_fitness: f64,
    pub low_confidence_frames: u64,
    /// Frames whose registration failed outright (excluded from fitness)
    pub failed_frames: u64,
    /// Heading search result, `None` if no frame was processed
    pub initial_pose: Option<InitialPoseEstimate>,
    pub trace: RecorderSummary,
    /// Stopped by shutdown request rather than end of input
    pub cancelled: bool,
}

/// Scan-to-map localizer.
pub struct Localizer {
    config: LocalizerConfig,
    registrar: Arc<dyn Registrar>,
    downsampler: Arc<dyn Downsampler>,
    estimator: InitialPoseEstimator,
    composer: FrameComposer,
    recorder: ResultRecorder,
    publisher: Box<dyn PosePublisher>,
    gate: ReadinessGate,
    map: Option<Arc<PointCloud>>,
    tracker: Option<PoseTracker>,
    fix: Option<AbsolutePositionFix>,
    initial_pose: Option<InitialPoseEstimate>,
    pending_scans: VecDeque<PointCloud>,
    next_id: u64,
}

impl Localizer {
    pub fn new(
        config: LocalizerConfig,
        registrar: Arc<dyn Registrar>,
        downsampler: Arc<dyn Downsampler>,
        extrinsics: SensorExtrinsics,
        recorder: ResultRecorder,
        publisher: Box<dyn PosePublisher>,
    ) -> Self {
        Self {
            estimator: InitialPoseEstimator::new(registrar.clone()),
            composer: FrameComposer::new(extrinsics),
            config,
            registrar,
            downsampler,
            recorder,
            publisher,
            gate: ReadinessGate::new(),
            map: None,
            tracker: None,
            fix: None,
            initial_pose: None,
            pending_scans: VecDeque::new(),
            next_id: 1,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.gate.state()
    }

    /// Prior map as received, `None` until it arrives.
    pub fn map(&self) -> Option<&Arc<PointCloud>> {
        self.map.as_ref()
    }

    /// Tracker diagnostics (zero before the map arrives).
    pub fn stats(&self) -> TrackerStats {
        self.tracker
            .as_ref()
            .map(|t| *t.stats())
            .unwrap_or_default()
    }

    /// Run until shutdown, end of input or an error.
    ///
    /// The trace is always finished. Shutdown (event or cleared `running`)
    /// during the readiness wait is a normal exit.
    pub fn run(
        mut self,
        inbox: &Receiver<LocalizerEvent>,
        running: &AtomicBool,
    ) -> Result<LocalizationSummary> {
        log::info!(
            "Localizer starting ({}, map frame '{}', lidar frame '{}')",
            self.registrar.name(),
            self.config.map_frame,
            self.config.lidar_frame
        );

        let outcome = self.event_loop(inbox, running);
        let stats = self.stats();

        let Self {
            recorder,
            initial_pose,
            ..
        } = self;
        let trace = recorder.finish(stats.cumulative_fitness);

        let cancelled = match outcome {
            Ok(cancelled) => cancelled,
            Err(LocalizationError::Cancelled) => true,
            Err(e) => {
                if let Err(trace_err) = &trace {
                    log::error!("Failed to finish trace: {}", trace_err);
                }
                return Err(e);
            }
        };
        let trace = trace?;

        let summary = LocalizationSummary {
            frames: trace.rows,
            cumulative_fitness: stats.cumulative_fitness,
            mean_fitness: stats.mean_fitness(),
            low_confidence_frames: stats.low_confidence_frames,
            failed_frames: stats.failed_frames,
            initial_pose,
            trace,
            cancelled,
        };

        log::info!(
            "Localization finished{}: {} frames, cumulative fitness {:.6}, mean {:.6}, {} low confidence, {} failed",
            if summary.cancelled { " (cancelled)" } else { "" },
            summary.frames,
            summary.cumulative_fitness,
            summary.mean_fitness,
            summary.low_confidence_frames,
            summary.failed_frames
        );

        Ok(summary)
    }

    /// Apply one event without blocking.
    ///
    /// Scans are processed only when the map and fix are both available;
    /// otherwise [`LocalizationError::NotReady`] is returned and the scan is
    /// dropped. `Shutdown` is a no-op here.
    pub fn feed(&mut self, event: LocalizerEvent) -> Result<Option<FrameOutput>> {
        match event {
            LocalizerEvent::Map(map) => {
                if self.on_map(map) {
                    self.gate.mark_map_ready();
                }
            }
            LocalizerEvent::Fix(fix) => {
                if self.on_fix(fix) {
                    self.gate.mark_fix_ready();
                }
            }
            LocalizerEvent::Scan(scan) => return self.process_scan(&scan),
            LocalizerEvent::Shutdown => {}
        }
        Ok(None)
    }

    /// Returns whether the loop ended because `running` cleared.
    fn event_loop(&mut self, inbox: &Receiver<LocalizerEvent>, running: &AtomicBool) -> Result<bool> {
        loop {
            if !running.load(Ordering::Relaxed) {
                log::info!("Shutdown requested");
                return Ok(true);
            }

            match inbox.recv_timeout(IDLE_POLL) {
                Ok(LocalizerEvent::Shutdown) => {
                    log::info!("Shutdown event received");
                    return Ok(false);
                }
                Ok(LocalizerEvent::Scan(scan)) => self.handle_scan(scan, inbox, running)?,
                Ok(event) => {
                    self.feed(event)?;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!("Input channel closed");
                    return Ok(false);
                }
            }
        }
    }

    /// Process `scan`, first waiting for the map and fix if needed.
    ///
    /// Scans received during the wait are processed afterwards in arrival
    /// order.
    fn handle_scan(
        &mut self,
        scan: PointCloud,
        inbox: &Receiver<LocalizerEvent>,
        running: &AtomicBool,
    ) -> Result<()> {
        self.pending_scans.push_back(scan);

        if !self.gate.is_open() {
            let policy = self.config.wait;
            let mut gate = std::mem::take(&mut self.gate);
            let waited = gate.wait_until_open(inbox, &policy, running, |event| {
                self.dispatch_while_waiting(event)
            });
            self.gate = gate;
            waited?;
        }

        while let Some(scan) = self.pending_scans.pop_front() {
            self.process_scan(&scan)?;
            if !running.load(Ordering::Relaxed) {
                if !self.pending_scans.is_empty() {
                    log::info!("Dropping {} queued scans on shutdown", self.pending_scans.len());
                    self.pending_scans.clear();
                }
                break;
            }
        }
        Ok(())
    }

    fn dispatch_while_waiting(&mut self, event: LocalizerEvent) -> GateSignal {
        match event {
            LocalizerEvent::Map(map) => {
                if self.on_map(map) {
                    GateSignal::Satisfied(Readiness {
                        map_ready: true,
                        fix_ready: false,
                    })
                } else {
                    GateSignal::Pending
                }
            }
            LocalizerEvent::Fix(fix) => {
                if self.on_fix(fix) {
                    GateSignal::Satisfied(Readiness {
                        map_ready: false,
                        fix_ready: true,
                    })
                } else {
                    GateSignal::Pending
                }
            }
            LocalizerEvent::Scan(scan) => {
                self.pending_scans.push_back(scan);
                GateSignal::Pending
            }
            LocalizerEvent::Shutdown => GateSignal::Shutdown,
        }
    }

    /// Accept the prior map. Returns `false` when it was not used.
    fn on_map(&mut self, map: PointCloud) -> bool {
        if self.map.is_some() {
            log::warn!("Ignoring additional map ({} points)", map.len());
            return false;
        }
        if map.is_empty() {
            log::warn!("Ignoring empty map");
            return false;
        }

        let map = Arc::new(map);
        self.tracker = Some(PoseTracker::new(
            &map,
            self.registrar.clone(),
            self.downsampler.clone(),
            self.config.tracker,
        ));
        self.map = Some(map);
        true
    }

    /// Accept the bootstrap fix. Returns `false` when it was not used.
    fn on_fix(&mut self, fix: AbsolutePositionFix) -> bool {
        if self.fix.is_some() {
            log::debug!(
                "Ignoring fix ({:.2}, {:.2}, {:.2}) @ {}",
                fix.x,
                fix.y,
                fix.z,
                fix.timestamp_us
            );
            return false;
        }

        log::info!("Position fix: ({:.3}, {:.3}, {:.3})", fix.x, fix.y, fix.z);
        self.fix = Some(fix);

        if self.initial_pose.is_none() {
            let pose = fix.pose_with_heading(0.0);
            self.publisher.publish_pose(&PoseStamped {
                frame_id: self.config.map_frame.clone(),
                timestamp_us: fix.timestamp_us,
                pose,
            });
            self.publisher.broadcast_transform(&TransformStamped {
                parent_frame: self.config.map_frame.clone(),
                child_frame: self.config.lidar_frame.clone(),
                timestamp_us: fix.timestamp_us,
                transform: pose,
            });
        }
        true
    }

    /// Register one scan, record it and publish the outputs.
    ///
    /// The first scan runs the heading search before tracking. Scans that
    /// are empty after downsampling are skipped without a trace row.
    fn process_scan(&mut self, scan: &PointCloud) -> Result<Option<FrameOutput>> {
        let Some(fix) = self.fix else {
            return Err(LocalizationError::NotReady {
                map_ready: self.tracker.is_some(),
                fix_ready: false,
                waited: Duration::ZERO,
            });
        };
        let Some(tracker) = self.tracker.as_mut() else {
            return Err(LocalizationError::NotReady {
                map_ready: false,
                fix_ready: true,
                waited: Duration::ZERO,
            });
        };

        let filtered = tracker.filter_scan(scan);
        if filtered.is_empty() {
            log::warn!(
                "Skipping scan @ {}: no points left after downsampling",
                scan.timestamp_us
            );
            return Ok(None);
        }

        if !tracker.is_seeded() {
            let estimate = self.estimator.estimate(
                &fix,
                tracker.map(),
                &filtered,
                &self.config.heading_search,
                &self.config.bootstrap,
            )?;
            tracker.seed(estimate.pose);
            self.initial_pose = Some(estimate);
        }

        let registration = tracker.update_filtered(&filtered)?;

        let id = self.next_id;
        let record = self.composer.record(id, &registration.transform);
        self.recorder.append(&record)?;
        self.next_id += 1;

        log::info!(
            "Frame {}: ({:.3}, {:.3}, {:.3}) yaw {:.4}, fitness {:.6}",
            id,
            record.x,
            record.y,
            record.z,
            record.yaw,
            registration.fitness
        );

        self.publish(scan, &registration.transform);

        Ok(Some(FrameOutput {
            record,
            registration,
        }))
    }

    fn publish(&mut self, scan: &PointCloud, map_to_lidar: &Pose3D) {
        let mut registered = scan.transformed(map_to_lidar);
        registered.frame_id = self.config.map_frame.clone();
        self.publisher.publish_cloud(&registered);

        self.publisher.publish_pose(&PoseStamped {
            frame_id: self.config.map_frame.clone(),
            timestamp_us: scan.timestamp_us,
            pose: *map_to_lidar,
        });

        self.publisher.broadcast_transform(&TransformStamped {
            parent_frame: self.config.lidar_frame.clone(),
            child_frame: self.config.map_frame.clone(),
            timestamp_us: scan.timestamp_us,
            transform: map_to_lidar.inverse(),
        });
    }
}
