//! # Lifecycle controller: `Running -> Stopping -> Stopped`.
//!
//! One [`Lifecycle`] instance is shared by every actor. A termination signal
//! or a console `exit` calls [`Lifecycle::request_stop`], which moves the
//! machine to `Stopping` and cancels the shared token; the accept loop, the
//! console, and the reaper all observe the token cooperatively, so shutdown
//! is deterministic rather than an abrupt handler racing in-flight work.
//!
//! ## Rules
//! - `request_stop` is idempotent: a second trigger while already `Stopping`
//!   (or `Stopped`) is a no-op and reports `false`.
//! - Only the orchestrator's shutdown sequence calls
//!   [`Lifecycle::mark_stopped`], after every child is down and the control
//!   socket is gone.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// Phase of the orchestrator's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Normal operation: serving requests, supervising children.
    Running,
    /// Teardown in progress: children being stopped.
    Stopping,
    /// Teardown complete; the process is about to exit.
    Stopped,
}

/// Shared shutdown state machine.
pub struct Lifecycle {
    phase: Mutex<Phase>,
    token: CancellationToken,
}

impl Lifecycle {
    /// Creates a lifecycle in the `Running` phase.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            phase: Mutex::new(Phase::Running),
            token: CancellationToken::new(),
        })
    }

    /// Requests the transition to `Stopping` and cancels the shared token.
    ///
    /// Returns `true` on the first effective trigger, `false` when already
    /// stopping or stopped.
    pub fn request_stop(&self) -> bool {
        let mut phase = self.lock_phase();
        match *phase {
            Phase::Running => {
                *phase = Phase::Stopping;
                self.token.cancel();
                true
            }
            Phase::Stopping | Phase::Stopped => false,
        }
    }

    /// Marks teardown complete.
    pub fn mark_stopped(&self) {
        *self.lock_phase() = Phase::Stopped;
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.lock_phase()
    }

    /// Token observed by every cooperative actor.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, Phase> {
        // A poisoned phase lock only means another thread panicked while
        // holding it; the Phase value itself is always valid.
        self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
