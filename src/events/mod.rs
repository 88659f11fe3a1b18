//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the registry, the
//! dispatcher, and the lifecycle controller.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ProcessRegistry` (launch/exit/terminate), `Dispatcher`
//!   (truck launches), `Orchestrator` (shutdown phases), `AckForwarder`
//!   (ack outcomes).
//! - **Consumers**: the orchestrator's fan-out listener, which delivers each
//!   event to the in-tree subscribers (`LogWriter`, `AckForwarder`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
