//! # fleetvisor
//!
//! **Fleetvisor** orchestrates a simulated autonomous-truck mine: one worker
//! process per truck, an optional local MQTT broker, and a front-end, all
//! supervised from a single runtime with a unix-socket control plane for
//! scaling the fleet at runtime.
//!
//! ## Architecture
//! ```text
//!  operator tools          human operator
//!        │                       │
//!        ▼                       ▼
//! ┌──────────────┐       ┌──────────────┐
//! │ ControlServer│       │   Console    │
//! │ (unix socket)│       │   (stdin)    │
//! └──────┬───────┘       └──────┬───────┘
//!        └───────────┬──────────┘
//!                    ▼
//!             ┌──────────────┐     route files
//!             │  Dispatcher  │──► validate (≥2 waypoints)
//!             └──────┬───────┘
//!                    ▼
//!             ┌──────────────┐
//!             │ProcessRegistry│──► spawn truck workers / broker / interface
//!             │ (RwLock table)│    (stdout+stderr → per-tag log file)
//!             └──────┬───────┘
//!                    │ publishes ProcessLaunched / ProcessExited /
//!                    │           TruckLaunched / ...
//!                    ▼
//!             ┌──────────────┐
//!             │     Bus      │──► LogWriter (tracing)
//!             │ (broadcast)  │──► AckForwarder ──► MQTT ack topic
//!             └──────────────┘
//!
//!  Reaper: every second, remove exited children from the registry.
//!  Lifecycle: Running ─► Stopping (signal / `exit`) ─► Stopped.
//! ```
//!
//! ## Shutdown
//! A termination signal or a console `exit` moves the [`Lifecycle`] to
//! `Stopping` and cancels the shared token; every actor observes it
//! cooperatively. Children receive a graceful stop, get a bounded grace
//! period (default 1s), then a hard kill; the broker is stopped last and the
//! control socket path is removed before the process exits.
//!
//! ## Example
//! ```no_run
//! use fleetvisor::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let orchestrator = Orchestrator::new(cfg, "localhost");
//!     orchestrator.start_broker().await;
//!     orchestrator.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
mod control;
mod core;
mod error;
mod events;
mod process;
mod publish;
mod route;
mod subscribers;

// ---- Public re-exports ----

pub use config::{collect_route_files, resolve_broker, truck_tag, Config};
pub use control::{AckPayload, Command, Console, ControlServer, Dispatcher, ErrorReply,
    ProcessListing, TruckStarted};
pub use crate::core::{wait_for_shutdown_signal, Lifecycle, Orchestrator, Phase};
pub use error::{CommandError, LaunchError, PublishError, RouteError, StartupError};
pub use events::{Bus, Event, EventKind};
pub use process::{find_on_path, LaunchReceipt, LaunchSpec, ManagedProcess, ProcessRegistry,
    ProcessStatus, ProcessSummary};
pub use publish::{select_publisher, AckPublisher, MosquittoPub, MqttPublisher, NoopPublisher};
pub use route::validate as validate_route;
pub use subscribers::{AckForwarder, LogWriter, Subscribe};
