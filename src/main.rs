//! fleetvisor - mine fleet orchestrator.
//!
//! Single entry point for running the whole simulated mine: optional build of
//! the truck worker, optional local MQTT broker, the initial truck fleet, the
//! front-end interface, and the control plane for scaling the fleet at
//! runtime.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::process::Command;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use fleetvisor::{collect_route_files, resolve_broker, Config, Orchestrator, StartupError};

/// fleetvisor - orchestrator for the simulated autonomous-truck mine
#[derive(Parser, Debug)]
#[command(name = "fleetvisor")]
#[command(version, about, long_about = None)]
struct Args {
    /// Run the build step (cmake + make) before starting
    #[arg(long)]
    build: bool,

    /// Number of truck instances to start
    #[arg(long, default_value_t = 1)]
    num_trucks: usize,

    /// Directory containing .route files (or a single route file)
    #[arg(long, default_value = "routes")]
    routes_dir: PathBuf,

    /// Start a local mosquitto broker
    #[arg(long)]
    start_broker: bool,

    /// MQTT broker address; use 'mock' to run without a broker
    #[arg(long, default_value = "localhost")]
    broker: String,

    /// Do not start the front-end interface
    #[arg(long)]
    no_interface: bool,

    /// Control-plane socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Directory receiving per-process log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Path of the truck worker binary
    #[arg(long)]
    truck_bin: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut cfg = Config::default();
    if let Some(socket) = args.socket.clone() {
        cfg.socket_path = socket;
    }
    if let Some(log_dir) = args.log_dir.clone() {
        cfg.log_dir = log_dir;
    }
    if let Some(truck_bin) = args.truck_bin.clone() {
        cfg.truck_bin = truck_bin;
    }
    cfg.routes_dir = args.routes_dir.clone();

    // MQTT_BROKER in the environment wins over the flag; the same address is
    // exported to every child.
    let broker = resolve_broker(&args.broker);

    std::fs::create_dir_all(&cfg.log_dir).map_err(|source| StartupError::LogDir {
        path: cfg.log_dir.display().to_string(),
        source,
    })?;

    if args.build {
        run_build_step(&cfg.truck_cwd).await?;
    }

    let orchestrator = Orchestrator::new(cfg.clone(), broker.clone());

    let broker_started = if args.start_broker {
        orchestrator.start_broker().await
    } else {
        false
    };
    if Config::is_mock_broker(&broker) && !broker_started {
        info!("mock broker mode; children run with MQTT_BROKER=mock");
    }

    let routes = collect_route_files(&cfg.routes_dir, args.num_trucks, &cfg.default_route);
    orchestrator
        .start_initial_trucks(args.num_trucks, &routes)
        .await;

    if !args.no_interface {
        orchestrator.start_interface().await;
    }

    info!("all processes started; entering supervision loop");
    orchestrator
        .run()
        .await
        .context("fleet orchestrator failed")?;
    Ok(())
}

/// Runs `cmake ..` and `make -j<ncpu>` in the build directory.
async fn run_build_step(build_dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(build_dir)
        .with_context(|| format!("failed to create build directory {}", build_dir.display()))?;

    info!("running cmake ..");
    let status = Command::new("cmake")
        .arg("..")
        .current_dir(build_dir)
        .stdin(Stdio::null())
        .status()
        .await
        .context("failed to run cmake")?;
    if !status.success() {
        bail!(StartupError::Build {
            reason: format!("cmake exited with {status}"),
        });
    }

    let jobs = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    info!(jobs, "running make");
    let status = Command::new("make")
        .arg("-j")
        .arg(jobs.to_string())
        .current_dir(build_dir)
        .stdin(Stdio::null())
        .status()
        .await
        .context("failed to run make")?;
    if !status.success() {
        bail!(StartupError::Build {
            reason: format!("make exited with {status}"),
        });
    }
    Ok(())
}
