//! # Runtime events emitted by the orchestrator.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Process events**: a managed child was launched, exited, or was
//!   terminated on request.
//! - **Fleet events**: a truck worker joined the fleet; an acknowledgement
//!   was published (or dropped).
//! - **Shutdown events**: the lifecycle controller's phases.
//!
//! The [`Event`] struct carries optional metadata (tag, pid, truck id, route,
//! exit code, reason) set per kind via `with_*` builders.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, restoring exact order when events are observed out of band.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Process events ===
    /// A child process was spawned and registered.
    ///
    /// Sets: `tag`, `pid`.
    ProcessLaunched,

    /// A registered child exited on its own and was reaped.
    ///
    /// Sets: `tag`, `pid`, `exit_code` (None when killed by a signal).
    ProcessExited,

    /// A registered child was stopped on request and removed.
    ///
    /// Sets: `tag`, `pid`.
    ProcessTerminated,

    // === Fleet events ===
    /// A truck worker joined the fleet via `addtruck`.
    ///
    /// Sets: `tag`, `pid`, `truck_id`, `route`. Triggers the acknowledgement
    /// publish.
    TruckLaunched,

    /// An acknowledgement was delivered to the bus transport.
    ///
    /// Sets: `truck_id`.
    AckPublished,

    /// An acknowledgement could not be delivered (logged, never fatal).
    ///
    /// Sets: `truck_id`, `reason`.
    AckDropped,

    // === Shutdown events ===
    /// Shutdown requested (signal or console `exit`).
    ShutdownRequested,

    /// Every child stopped within the grace period.
    AllStoppedWithin,

    /// The grace period elapsed with children still alive; force-kill was
    /// required.
    ///
    /// Sets: `reason` (stuck tags).
    GraceExceeded,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Registry tag, if applicable.
    pub tag: Option<Arc<str>>,
    /// OS process id, if applicable.
    pub pid: Option<u32>,
    /// Truck id for fleet events.
    pub truck_id: Option<u32>,
    /// Route path for fleet events.
    pub route: Option<Arc<str>>,
    /// Exit code (None when the child died from a signal).
    pub exit_code: Option<i32>,
    /// Human-readable reason (errors, stuck tags).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            tag: None,
            pid: None,
            truck_id: None,
            route: None,
            exit_code: None,
            reason: None,
        }
    }

    /// Attaches a registry tag.
    #[inline]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attaches an OS process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a truck id.
    #[inline]
    pub fn with_truck_id(mut self, id: u32) -> Self {
        self.truck_id = Some(id);
        self
    }

    /// Attaches a route path.
    #[inline]
    pub fn with_route(mut self, route: impl Into<Arc<str>>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Attaches an exit code (`None` models death by signal).
    #[inline]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
