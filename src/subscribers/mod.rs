//! Event subscribers: consumers of the internal bus.
//!
//! The orchestrator runs one fan-out listener that delivers every bus event
//! to each registered [`Subscribe`] implementation in turn. In-tree
//! subscribers:
//!
//! - [`LogWriter`] — renders runtime events through `tracing`.
//! - [`AckForwarder`] — turns `TruckLaunched` events into best-effort
//!   acknowledgement publishes.

mod ack;
mod log;
mod subscribe;

pub use ack::AckForwarder;
pub use log::LogWriter;
pub use subscribe::Subscribe;
