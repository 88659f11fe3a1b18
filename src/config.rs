//! # Global orchestrator configuration.
//!
//! Provides [`Config`], centralized settings for the fleet runtime.
//!
//! Config is consumed in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::new(config, broker)`
//! 2. **Launch specs**: `LaunchSpec::truck(&config, ...)` and friends derive
//!    command lines, log paths, and working directories from it.
//!
//! ## Field semantics
//! - `grace`: bounded wait after a graceful-stop signal before force-kill
//! - `reap_interval`: cadence of the exit-scan loop
//! - `bus_capacity`: internal event bus ring buffer size (min 1; clamped)
//! - `socket_path`: control-plane unix socket, created at startup, removed at
//!   shutdown
//! - `mqtt_port`: port appended to the broker host for the ack transport

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Well-known tag of the message broker process when started by this
/// orchestrator. Stopped last during shutdown.
pub const BROKER_TAG: &str = "broker";

/// Well-known tag of the front-end interface process.
pub const INTERFACE_TAG: &str = "interface";

/// Returns the registry tag for a truck id (`truck:<id>`).
pub fn truck_tag(id: u32) -> String {
    format!("truck:{id}")
}

/// Global configuration for the fleet orchestrator.
#[derive(Clone, Debug)]
pub struct Config {
    /// Filesystem path of the control-plane unix socket.
    pub socket_path: PathBuf,

    /// Directory receiving one log file per managed process.
    ///
    /// Created at startup if absent; failure to create it is fatal.
    pub log_dir: PathBuf,

    /// Maximum wait for a child to exit after a graceful-stop signal.
    ///
    /// Applies to `terminate` on a single tag and to the shutdown sweep.
    /// After `grace`, the child is force-killed.
    pub grace: Duration,

    /// Interval between exit scans of the registry.
    pub reap_interval: Duration,

    /// Capacity of the internal event bus broadcast channel.
    ///
    /// Slow listeners that lag more than `bus_capacity` events skip older
    /// items. Minimum value is 1 (enforced by the bus).
    pub bus_capacity: usize,

    /// TCP port of the MQTT broker (ack transport and health probe).
    pub mqtt_port: u16,

    /// Topic receiving `addtruck` acknowledgements.
    pub ack_topic: String,

    /// Path of the truck worker binary.
    pub truck_bin: PathBuf,

    /// Working directory for spawned truck workers.
    pub truck_cwd: PathBuf,

    /// Front-end interface script, spawned under a Python interpreter.
    pub interface_script: PathBuf,

    /// Directory scanned for `*.route` files at startup.
    pub routes_dir: PathBuf,

    /// Route file used to pad the initial fleet when `routes_dir` does not
    /// provide enough routes.
    pub default_route: PathBuf,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Log file path for a truck worker.
    pub fn truck_log(&self, id: u32) -> PathBuf {
        self.log_dir.join(format!("truck_{id}.log"))
    }

    /// Log file path for an arbitrary tag (`:` is not filename-safe).
    pub fn tag_log(&self, tag: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log", tag.replace(':', "_")))
    }

    /// Returns `true` when `broker` names the no-broker mock mode.
    pub fn is_mock_broker(broker: &str) -> bool {
        broker == "mock"
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `socket_path = fleetvisor.sock` (current directory)
    /// - `log_dir = logs`
    /// - `grace = 1s` (children get one second to exit cleanly)
    /// - `reap_interval = 1s`
    /// - `bus_capacity = 1024`
    /// - `mqtt_port = 1883`
    /// - truck worker expected at `build/mine_truck`, run from `build/`
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("fleetvisor.sock"),
            log_dir: PathBuf::from("logs"),
            grace: Duration::from_secs(1),
            reap_interval: Duration::from_secs(1),
            bus_capacity: 1024,
            mqtt_port: 1883,
            ack_topic: "/mina/gerente/add_truck/ack".to_string(),
            truck_bin: PathBuf::from("build/mine_truck"),
            truck_cwd: PathBuf::from("build"),
            interface_script: PathBuf::from("interface/control_panel.py"),
            routes_dir: PathBuf::from("routes"),
            default_route: PathBuf::from("routes/example.route"),
        }
    }
}

/// Resolves the effective broker address: the `MQTT_BROKER` environment
/// variable wins over the supplied flag value.
///
/// The result is both consumed by the acknowledgement publisher and exported
/// to every spawned child.
pub fn resolve_broker(flag_value: &str) -> String {
    std::env::var("MQTT_BROKER")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| flag_value.to_string())
}

/// Builds the list of route files for the initial fleet.
///
/// - `routes_dir` is a directory: sorted `*.route` entries.
/// - `routes_dir` is a file: that file, once per truck.
/// - Fewer routes than trucks: padded with `default_route`; the launcher
///   cycles through whatever is available.
pub fn collect_route_files(routes_dir: &Path, num_trucks: usize, default_route: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if routes_dir.is_dir() {
        if let Ok(entries) = std::fs::read_dir(routes_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "route") {
                    files.push(path);
                }
            }
        }
        files.sort();
    } else if routes_dir.exists() {
        for _ in 0..num_trucks {
            files.push(routes_dir.to_path_buf());
        }
    }
    while files.len() < num_trucks {
        files.push(default_route.to_path_buf());
    }
    files
}
