//! # Orchestrator: wires the fleet runtime and drives graceful shutdown.
//!
//! The [`Orchestrator`] owns the event bus, the process registry, the shared
//! dispatcher, and the lifecycle controller. It starts the supporting actors
//! (control server, console, reaper, event listener) and runs until a
//! termination signal or a console `exit` flips the lifecycle.
//!
//! ## High-level architecture
//! ```text
//!   unix socket ──► ControlServer ──┐
//!                                   ├──► Dispatcher ──► ProcessRegistry ──► child processes
//!   stdin ───────► Console ─────────┘          │                │
//!                                              │                ├─ publish ProcessLaunched/Exited/...
//!                                              └─ publish TruckLaunched
//!                                                               ▼
//!                                                          Bus (broadcast)
//!                                                               │
//!                                                    fan-out listener
//!                                                     ├─► LogWriter (tracing)
//!                                                     └─► AckForwarder ──► MQTT / mosquitto_pub
//!
//!   Reaper ──every reap_interval──► ProcessRegistry::reap()
//!
//! Shutdown path:
//!   signal / console exit ──► Lifecycle::request_stop() ──► token cancelled
//!     └─► registry.shutdown_all(grace)   (children first, broker last)
//!     └─► control socket path removed
//!     └─► Lifecycle::mark_stopped() ──► run() returns, process exits 0
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast::error::RecvError;
use tokio::time;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::control::{Console, ControlServer, Dispatcher};
use crate::core::{reaper, shutdown, Lifecycle};
use crate::error::StartupError;
use crate::events::{Bus, Event, EventKind};
use crate::process::{find_on_path, LaunchSpec, ProcessRegistry};
use crate::publish::{select_publisher, AckPublisher};
use crate::subscribers::{AckForwarder, LogWriter, Subscribe};

/// Settle time between spawning the broker and probing its port.
const BROKER_SETTLE: Duration = Duration::from_millis(600);

/// Stagger between initial truck launches.
const TRUCK_STAGGER: Duration = Duration::from_millis(200);

/// Top-level fleet runtime.
pub struct Orchestrator {
    cfg: Arc<Config>,
    bus: Bus,
    registry: Arc<ProcessRegistry>,
    lifecycle: Arc<Lifecycle>,
    dispatcher: Arc<Dispatcher>,
    publisher: Arc<dyn AckPublisher>,
    broker: String,
}

impl Orchestrator {
    /// Builds the runtime for the given configuration and broker address.
    ///
    /// The acknowledgement transport is selected here, once.
    pub fn new(cfg: Config, broker: impl Into<String>) -> Self {
        let broker = broker.into();
        let cfg = Arc::new(cfg);
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let registry = ProcessRegistry::new(bus.clone());
        let lifecycle = Lifecycle::new();
        let publisher = select_publisher(&broker, cfg.mqtt_port);
        let dispatcher = Dispatcher::new(
            Arc::clone(&cfg),
            Arc::clone(&registry),
            bus.clone(),
            broker.clone(),
        );
        Self {
            cfg,
            bus,
            registry,
            lifecycle,
            dispatcher,
            publisher,
            broker,
        }
    }

    /// Shared dispatcher (control-plane command executor).
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Shared lifecycle controller.
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Process registry.
    pub fn registry(&self) -> Arc<ProcessRegistry> {
        Arc::clone(&self.registry)
    }

    /// Starts a local mosquitto broker under the `broker` tag.
    ///
    /// Skipped with a log line when mosquitto is not on `PATH`. After a short
    /// settle period the broker port is probed; an unreachable broker is a
    /// warning, not an error (some features degrade, nothing stops).
    pub async fn start_broker(&self) -> bool {
        let Some(mosquitto) = find_on_path("mosquitto") else {
            info!("mosquitto not found; skipping broker start");
            return false;
        };
        let spec = LaunchSpec::broker(&self.cfg, &mosquitto);
        match self.registry.launch(spec).await {
            Ok(receipt) => {
                info!(pid = receipt.pid, "mosquitto started");
                time::sleep(BROKER_SETTLE).await;
                if probe_port(self.cfg.mqtt_port).await {
                    info!(port = self.cfg.mqtt_port, "broker listening");
                } else {
                    warn!(
                        port = self.cfg.mqtt_port,
                        "broker not responding; continuing anyway"
                    );
                }
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to start broker");
                false
            }
        }
    }

    /// Starts the front-end interface under the `interface` tag.
    ///
    /// Prefers a `venv` interpreter next to the script; skipped with a log
    /// line when the script or an interpreter is missing.
    pub async fn start_interface(&self) {
        if !self.cfg.interface_script.exists() {
            info!(
                script = %self.cfg.interface_script.display(),
                "interface script not found; skipping"
            );
            return;
        }
        let Some(python) = interface_python(&self.cfg) else {
            info!("python not found; skipping interface");
            return;
        };
        let spec = LaunchSpec::interface(&self.cfg, &python, &self.broker);
        if let Err(err) = self.registry.launch(spec).await {
            warn!(error = %err, "failed to start interface");
        }
    }

    /// Launches the initial fleet: truck ids `1..=count`, cycling through
    /// `routes`.
    ///
    /// Individual failures are logged and do not stop the rest of the fleet.
    pub async fn start_initial_trucks(&self, count: usize, routes: &[PathBuf]) {
        if count == 0 || routes.is_empty() {
            return;
        }
        for index in 0..count {
            let id = (index + 1) as u32;
            let route = &routes[index % routes.len()];
            if let Err(err) = self.dispatcher.add_truck(id, route).await {
                warn!(id, error = %err, "initial truck not started");
            }
            time::sleep(TRUCK_STAGGER).await;
        }
    }

    /// Runs the orchestrator until shutdown, then tears everything down.
    ///
    /// # Errors
    /// [`StartupError::SocketBind`] when the control socket cannot be bound;
    /// any children already started are stopped before returning.
    pub async fn run(self) -> Result<(), StartupError> {
        let server = match ControlServer::bind(&self.cfg.socket_path, self.dispatcher()) {
            Ok(server) => server,
            Err(err) => {
                // Children from the startup sequence must not outlive a
                // failed bind.
                self.registry.shutdown_all(self.cfg.grace).await;
                return Err(err);
            }
        };

        self.spawn_event_listener();
        let token = self.lifecycle.token();
        tokio::spawn(reaper::run(
            Arc::clone(&self.registry),
            self.cfg.reap_interval,
            token.clone(),
        ));
        tokio::spawn(server.run(token.clone()));
        tokio::spawn(Console::new(self.dispatcher(), self.lifecycle()).run());
        info!("fleet orchestrator running");

        tokio::select! {
            registered = shutdown::wait_for_shutdown_signal() => {
                if let Err(err) = registered {
                    error!(error = %err, "signal handling unavailable; stopping");
                }
            }
            _ = token.cancelled() => {}
        }

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.lifecycle.request_stop();
        info!("stopping all children...");
        self.registry.shutdown_all(self.cfg.grace).await;

        if let Err(err) = std::fs::remove_file(&self.cfg.socket_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %err, "failed to remove control socket");
            }
        }
        self.lifecycle.mark_stopped();
        info!("fleet orchestrator stopped");
        Ok(())
    }

    /// Subscribes to the bus and fans events out to the in-tree subscribers.
    fn spawn_event_listener(&self) {
        let mut rx = self.bus.subscribe();
        let subscribers: Vec<Arc<dyn Subscribe>> = vec![
            Arc::new(LogWriter),
            Arc::new(AckForwarder::new(
                Arc::clone(&self.publisher),
                self.cfg.ack_topic.clone(),
                self.bus.clone(),
            )),
        ];
        let token = self.lifecycle.token();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(event) => {
                            for subscriber in &subscribers {
                                subscriber.on_event(&event).await;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event listener lagged");
                        }
                    }
                }
            }
        });
    }
}

/// TCP probe of the broker port on localhost, bounded to one second.
async fn probe_port(port: u16) -> bool {
    let addr = format!("127.0.0.1:{port}");
    matches!(
        time::timeout(Duration::from_secs(1), TcpStream::connect(&addr)).await,
        Ok(Ok(_))
    )
}

/// Picks the interpreter for the interface script: the script's own venv if
/// present, otherwise `python3`/`python` from `PATH`.
fn interface_python(cfg: &Config) -> Option<PathBuf> {
    let venv = cfg
        .interface_script
        .parent()
        .map(|dir| dir.join("venv/bin/python"));
    if let Some(venv) = venv {
        if venv.exists() {
            return Some(venv);
        }
    }
    find_on_path("python3").or_else(|| find_on_path("python"))
}
