//! Two-input readiness barrier.
//!
//! Tracking needs both the prior map and a position fix. When a scan shows up
//! before both have arrived, the localizer blocks on its inbound channel,
//! dispatching every event it receives, until the gate opens, a timeout
//! expires or shutdown is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::{LocalizationError, Result};

/// Snapshot of the two readiness conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub map_ready: bool,
    pub fix_ready: bool,
}

impl Readiness {
    pub fn is_open(&self) -> bool {
        self.map_ready && self.fix_ready
    }

    /// Human-readable list of the missing inputs.
    pub fn missing(&self) -> &'static str {
        match (self.map_ready, self.fix_ready) {
            (false, false) => "map and position fix",
            (false, true) => "map",
            (true, false) => "position fix",
            (true, true) => "nothing",
        }
    }
}

/// How long to wait and how often to complain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub log_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            log_interval: Duration::from_secs(1),
        }
    }
}

/// Outcome of dispatching one event while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// The event made an input available.
    Satisfied(Readiness),
    /// Nothing changed (a queued scan, a duplicate input).
    Pending,
    /// Shutdown requested.
    Shutdown,
}

/// Map/fix barrier.
#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    state: Readiness,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_map_ready(&mut self) {
        self.state.map_ready = true;
    }

    pub fn mark_fix_ready(&mut self) {
        self.state.fix_ready = true;
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Block on `inbox` until both inputs are available.
    ///
    /// Every received event goes to `dispatch`; its [`GateSignal`] updates the
    /// gate. Returns immediately when already open.
    ///
    /// # Errors
    ///
    /// - [`LocalizationError::NotReady`] when `policy.timeout` elapses or the
    ///   channel disconnects first
    /// - [`LocalizationError::Cancelled`] when `running` clears or `dispatch`
    ///   reports shutdown
    pub fn wait_until_open<T, F>(
        &mut self,
        inbox: &Receiver<T>,
        policy: &WaitPolicy,
        running: &AtomicBool,
        mut dispatch: F,
    ) -> Result<Readiness>
    where
        F: FnMut(T) -> GateSignal,
    {
        let start = Instant::now();
        let deadline = start + policy.timeout;
        let mut next_log = start;

        while !self.is_open() {
            if !running.load(Ordering::Relaxed) {
                return Err(LocalizationError::Cancelled);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.not_ready(start));
            }
            if now >= next_log {
                log::warn!("Waiting for {} ...", self.state.missing());
                next_log = now + policy.log_interval;
            }

            // A zero log interval must not turn the wait into a spin
            let wake = if policy.log_interval.is_zero() {
                deadline
            } else {
                deadline.min(next_log)
            };
            match inbox.recv_deadline(wake) {
                Ok(event) => match dispatch(event) {
                    GateSignal::Satisfied(update) => {
                        self.state.map_ready |= update.map_ready;
                        self.state.fix_ready |= update.fix_ready;
                    }
                    GateSignal::Pending => {}
                    GateSignal::Shutdown => return Err(LocalizationError::Cancelled),
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("Input channel closed while waiting for {}", self.state.missing());
                    return Err(self.not_ready(start));
                }
            }
        }

        log::debug!("Inputs ready after {:?}", start.elapsed());
        Ok(self.state)
    }

    fn not_ready(&self, start: Instant) -> LocalizationError {
        LocalizationError::NotReady {
            map_ready: self.state.map_ready,
            fix_ready: self.state.fix_ready,
            waited: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::thread;

    #[derive(Debug)]
    enum Input {
        Map,
        Fix,
        Other,
        Stop,
    }

    fn dispatch(event: Input) -> GateSignal {
        match event {
            Input::Map => GateSignal::Satisfied(Readiness {
                map_ready: true,
                fix_ready: false,
            }),
            Input::Fix => GateSignal::Satisfied(Readiness {
                map_ready: false,
                fix_ready: true,
            }),
            Input::Other => GateSignal::Pending,
            Input::Stop => GateSignal::Shutdown,
        }
    }

    fn short_policy() -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_millis(100),
            log_interval: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_open_gate_returns_immediately() {
        let (_tx, rx) = unbounded::<Input>();
        let mut gate = ReadinessGate::new();
        gate.mark_map_ready();
        gate.mark_fix_ready();

        let running = AtomicBool::new(true);
        let state = gate
            .wait_until_open(&rx, &short_policy(), &running, dispatch)
            .unwrap();
        assert!(state.is_open());
    }

    #[test]
    fn test_opens_on_both_inputs() {
        let (tx, rx) = unbounded();
        tx.send(Input::Other).unwrap();
        tx.send(Input::Fix).unwrap();
        tx.send(Input::Map).unwrap();
        tx.send(Input::Other).unwrap();

        let mut gate = ReadinessGate::new();
        let running = AtomicBool::new(true);
        let mut seen = 0;
        gate.wait_until_open(&rx, &short_policy(), &running, |e| {
            seen += 1;
            dispatch(e)
        })
        .unwrap();

        assert!(gate.is_open());
        // Stops consuming once open
        assert_eq!(seen, 3);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_woken_by_late_arrival() {
        let (tx, rx) = unbounded();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            tx.send(Input::Map).unwrap();
            tx.send(Input::Fix).unwrap();
            // Keep the channel open past the wait
            thread::sleep(Duration::from_millis(50));
        });

        let mut gate = ReadinessGate::new();
        let running = AtomicBool::new(true);
        let policy = WaitPolicy {
            timeout: Duration::from_secs(5),
            log_interval: Duration::from_millis(10),
        };
        assert!(gate.wait_until_open(&rx, &policy, &running, dispatch).is_ok());
        producer.join().unwrap();
    }

    #[test]
    fn test_timeout_reports_missing_input() {
        let (tx, rx) = unbounded();
        tx.send(Input::Map).unwrap();

        let mut gate = ReadinessGate::new();
        let running = AtomicBool::new(true);
        let err = gate
            .wait_until_open(&rx, &short_policy(), &running, dispatch)
            .unwrap_err();

        match err {
            LocalizationError::NotReady {
                map_ready,
                fix_ready,
                waited,
            } => {
                assert!(map_ready);
                assert!(!fix_ready);
                assert!(waited >= Duration::from_millis(100));
            }
            other => panic!("unexpected error: {other}"),
        }
        drop(tx);
    }

    #[test]
    fn test_zero_log_interval_blocks_until_deadline() {
        let (tx, rx) = unbounded::<Input>();
        let mut gate = ReadinessGate::new();
        let running = AtomicBool::new(true);
        let policy = WaitPolicy {
            timeout: Duration::from_millis(80),
            log_interval: Duration::ZERO,
        };

        let started = Instant::now();
        let err = gate
            .wait_until_open(&rx, &policy, &running, dispatch)
            .unwrap_err();
        assert!(matches!(err, LocalizationError::NotReady { .. }));
        assert!(started.elapsed() >= Duration::from_millis(80));
        drop(tx);
    }

    #[test]
    fn test_disconnect_is_not_ready() {
        let (tx, rx) = unbounded::<Input>();
        drop(tx);

        let mut gate = ReadinessGate::new();
        let running = AtomicBool::new(true);
        let err = gate
            .wait_until_open(&rx, &short_policy(), &running, dispatch)
            .unwrap_err();
        assert!(matches!(err, LocalizationError::NotReady { .. }));
    }

    #[test]
    fn test_cancellation() {
        let (tx, rx) = unbounded();
        let mut gate = ReadinessGate::new();

        let stopped = AtomicBool::new(false);
        assert!(matches!(
            gate.wait_until_open(&rx, &short_policy(), &stopped, dispatch),
            Err(LocalizationError::Cancelled)
        ));

        tx.send(Input::Stop).unwrap();
        let running = AtomicBool::new(true);
        assert!(matches!(
            gate.wait_until_open(&rx, &short_policy(), &running, dispatch),
            Err(LocalizationError::Cancelled)
        ));
    }

    #[test]
    fn test_missing_labels() {
        let mut state = Readiness::default();
        assert_eq!(state.missing(), "map and position fix");
        state.map_ready = true;
        assert_eq!(state.missing(), "position fix");
    }
}
