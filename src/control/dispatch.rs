//! # Shared command executor.
//!
//! [`Dispatcher`] sits behind both transports and owns the full `addtruck`
//! sequence: presence check → route validation → launch → reply. The reply
//! always reflects the completed outcome; nothing is reported before the
//! operation has finished or definitively failed.
//!
//! ## Rules
//! - The uniqueness guarantee lives in the registry (check + spawn + insert
//!   under one write lock). The dispatcher's own presence check is a fast
//!   path that spares route validation for obviously duplicate ids; losing
//!   the race is still mapped to `AlreadyExists`.
//! - Acknowledgements are decoupled: a successful launch publishes
//!   [`EventKind::TruckLaunched`] on the internal bus, and the ack forwarder
//!   pushes it to the broker after the fact. A publish failure can never
//!   reach the requester.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::{self, Config};
use crate::control::response::TruckStarted;
use crate::error::{CommandError, LaunchError};
use crate::events::{Bus, Event, EventKind};
use crate::process::{LaunchSpec, ProcessRegistry, ProcessSummary};

/// Executes control-plane commands against the registry.
pub struct Dispatcher {
    cfg: Arc<Config>,
    registry: Arc<ProcessRegistry>,
    bus: Bus,
    broker: String,
}

impl Dispatcher {
    /// Creates a dispatcher bound to a registry and broker address.
    pub fn new(
        cfg: Arc<Config>,
        registry: Arc<ProcessRegistry>,
        bus: Bus,
        broker: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            registry,
            bus,
            broker: broker.into(),
        })
    }

    /// Registry this dispatcher operates on.
    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Effective broker address exported to spawned workers.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// Starts a new truck worker: presence check, route validation, launch.
    ///
    /// # Errors
    /// - [`CommandError::AlreadyExists`] — a live entry holds `truck:<id>`.
    /// - [`CommandError::RouteInvalid`] — the route file failed validation.
    /// - [`CommandError::SpawnFailed`] — the worker could not be started.
    pub async fn add_truck(&self, id: u32, route: &Path) -> Result<TruckStarted, CommandError> {
        let tag = config::truck_tag(id);
        if self.registry.contains(&tag).await {
            return Err(CommandError::AlreadyExists { id });
        }

        crate::route::validate(route)?;

        let spec = LaunchSpec::truck(&self.cfg, id, route, &self.broker);
        let receipt = self.registry.launch(spec).await.map_err(|err| match err {
            // Lost a same-id race after the fast-path check.
            LaunchError::TagInUse { .. } => CommandError::AlreadyExists { id },
            other => CommandError::SpawnFailed(other),
        })?;

        let route_text = route.display().to_string();
        debug!(id, pid = receipt.pid, route = %route_text, "truck joined the fleet");
        self.bus.publish(
            Event::new(EventKind::TruckLaunched)
                .with_tag(tag)
                .with_truck_id(id)
                .with_pid(receipt.pid)
                .with_route(route_text.as_str()),
        );

        Ok(TruckStarted::new(id, receipt.pid, route_text))
    }

    /// Snapshot of all managed processes.
    pub async fn list(&self) -> Vec<ProcessSummary> {
        self.registry.list().await
    }
}
