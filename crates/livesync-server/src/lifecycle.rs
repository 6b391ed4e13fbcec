//! Process lifecycle: `Stopped → Starting → Running → Stopping → Stopped`.
//!
//! Transitions only move forward. Once the server is back in `Stopped` it
//! cannot be started again.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not started, or fully stopped.
    Stopped,
    /// Validating the watch root and acquiring resources.
    Starting,
    /// Detector and server both active.
    Running,
    /// Detector stopping, connections closing.
    Stopping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, thiserror::Error)]
#[error("Invalid lifecycle transition from {from} to {to}")]
pub struct LifecycleError {
    /// Phase at the time of the request.
    pub from: Phase,
    /// Requested phase.
    pub to: Phase,
}

// Raw states. `FINISHED` is reported as `Phase::Stopped` but cannot restart.
const INITIAL: u8 = 0;
const STARTING: u8 = 1;
const RUNNING: u8 = 2;
const STOPPING: u8 = 3;
const FINISHED: u8 = 4;

/// Thread-safe one-way lifecycle tracker.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    /// Create a tracker in the initial `Stopped` phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        decode(self.state.load(Ordering::Acquire))
    }

    /// Whether the lifecycle has completed and can no longer advance.
    pub fn is_finished(&self) -> bool {
        self.state.load(Ordering::Acquire) == FINISHED
    }

    /// Move to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] if `to` does not directly follow the
    /// current phase.
    pub fn transition(&self, to: Phase) -> Result<(), LifecycleError> {
        let (allowed, next): (&[u8], u8) = match to {
            Phase::Starting => (&[INITIAL], STARTING),
            Phase::Running => (&[STARTING], RUNNING),
            // Startup may fail after resources were acquired
            Phase::Stopping => (&[STARTING, RUNNING], STOPPING),
            Phase::Stopped => (&[STOPPING], FINISHED),
        };

        let current = self.state.load(Ordering::Acquire);
        if !allowed.contains(&current)
            || self
                .state
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Err(LifecycleError {
                from: self.phase(),
                to,
            });
        }

        tracing::info!(from = %decode(current), to = %to, "Lifecycle transition");
        Ok(())
    }
}

fn decode(raw: u8) -> Phase {
    match raw {
        STARTING => Phase::Starting,
        RUNNING => Phase::Running,
        STOPPING => Phase::Stopping,
        _ => Phase::Stopped,
    }
}
