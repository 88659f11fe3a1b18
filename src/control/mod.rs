//! Control plane: command parsing, dispatch, and the two transports.
//!
//! The same closed command set is served over two transports that differ only
//! in framing and output format:
//!
//! - [`server`]: unix-socket server speaking newline-delimited JSON replies.
//! - [`console`]: the orchestrator's own stdin, printing human-readable text.
//!
//! Both feed parsed commands into one [`Dispatcher`], which owns the
//! check → validate → launch sequence against the process registry.

mod command;
mod console;
mod dispatch;
mod response;
mod server;

pub use command::Command;
pub use console::Console;
pub use dispatch::Dispatcher;
pub use response::{AckPayload, ErrorReply, ProcessListing, TruckStarted};
pub use server::ControlServer;
