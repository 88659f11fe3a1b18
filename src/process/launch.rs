//! # Child process launching.
//!
//! [`LaunchSpec`] describes one child to start: program, arguments, working
//! directory, extra environment, and the log file receiving its output.
//! [`LaunchSpec::spawn`] turns it into a [`ManagedProcess`], the unit the
//! registry supervises.
//!
//! ## Rules
//! - stdout and stderr are redirected to the log file, opened in **append**
//!   mode; the spawned child owns the sink handles, so dropping the entry
//!   closes them.
//! - A program given as a path (contains a separator) must exist on disk
//!   before spawning; bare names are resolved through `PATH` by the OS.
//! - Spawn failures leave nothing behind: no entry, no running process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::config::{self, Config};
use crate::error::LaunchError;

/// Status of a managed child, derived on demand (never stored).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The child has not exited yet.
    Running,
    /// The child exited; `None` means it was killed by a signal.
    Exited(Option<i32>),
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessStatus::Running => write!(f, "running"),
            ProcessStatus::Exited(Some(code)) => write!(f, "exited({code})"),
            ProcessStatus::Exited(None) => write!(f, "exited(signal)"),
        }
    }
}

/// Description of one child process to start.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Registry tag, unique among live entries (`truck:<id>`, `interface`,
    /// `broker`).
    pub tag: String,
    /// Executable: a path, or a bare name resolved through `PATH`.
    pub program: PathBuf,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Working directory for the child (`None` = inherit).
    pub cwd: Option<PathBuf>,
    /// Extra environment variables (on top of the inherited environment).
    pub env: Vec<(String, String)>,
    /// Log file receiving stdout + stderr, opened in append mode.
    pub log_path: PathBuf,
}

impl LaunchSpec {
    /// Spec for a truck worker: `<truck_bin> --truck-id=<id> --route=<path>`,
    /// run from the build directory with `MQTT_BROKER` exported.
    pub fn truck(cfg: &Config, id: u32, route: &Path, broker: &str) -> Self {
        Self {
            tag: config::truck_tag(id),
            program: cfg.truck_bin.clone(),
            args: vec![
                format!("--truck-id={id}"),
                format!("--route={}", route.display()),
            ],
            cwd: Some(cfg.truck_cwd.clone()),
            env: vec![("MQTT_BROKER".to_string(), broker.to_string())],
            log_path: cfg.truck_log(id),
        }
    }

    /// Spec for the front-end interface script under a Python interpreter.
    pub fn interface(cfg: &Config, python: &Path, broker: &str) -> Self {
        let cwd = cfg.interface_script.parent().map(Path::to_path_buf);
        Self {
            tag: config::INTERFACE_TAG.to_string(),
            program: python.to_path_buf(),
            args: vec![cfg.interface_script.display().to_string()],
            cwd,
            env: vec![("MQTT_BROKER".to_string(), broker.to_string())],
            log_path: cfg.tag_log(config::INTERFACE_TAG),
        }
    }

    /// Spec for a local mosquitto broker in verbose mode.
    pub fn broker(cfg: &Config, mosquitto: &Path) -> Self {
        Self {
            tag: config::BROKER_TAG.to_string(),
            program: mosquitto.to_path_buf(),
            args: vec!["-v".to_string()],
            cwd: None,
            env: Vec::new(),
            log_path: cfg.tag_log(config::BROKER_TAG),
        }
    }

    /// Spawns the child with output redirected to the log sink.
    ///
    /// # Errors
    /// - [`LaunchError::MissingBinary`] — `program` is a path and does not
    ///   exist.
    /// - [`LaunchError::LogSink`] — the log file could not be opened.
    /// - [`LaunchError::Spawn`] — the OS refused to create the process.
    pub(crate) fn spawn(&self) -> Result<ManagedProcess, LaunchError> {
        if self.program.components().count() > 1 && !self.program.exists() {
            return Err(LaunchError::MissingBinary {
                path: self.program.display().to_string(),
            });
        }

        let sink = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|source| LaunchError::LogSink {
                path: self.log_path.display().to_string(),
                source,
            })?;
        let stderr_sink = sink.try_clone().map_err(|source| LaunchError::LogSink {
            path: self.log_path.display().to_string(),
            source,
        })?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::from(stderr_sink))
            // Children outlive a crashed orchestrator; only the lifecycle
            // controller stops them.
            .kill_on_drop(false);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            tag: self.tag.clone(),
            source,
        })?;
        let pid = child.id().unwrap_or_default();

        Ok(ManagedProcess {
            tag: self.tag.clone(),
            pid,
            child,
            log_path: self.log_path.clone(),
        })
    }
}

/// One supervised child: the registry owns it exclusively until removal.
///
/// The log sink handles live inside the child's stdio; dropping the entry
/// (after the child has been stopped or reaped) closes them.
#[derive(Debug)]
pub struct ManagedProcess {
    tag: String,
    pid: u32,
    pub(crate) child: Child,
    log_path: PathBuf,
}

impl ManagedProcess {
    /// Registry tag of this entry.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// OS process id recorded at spawn time.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Log file this child writes to.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Derives the current status without blocking.
    pub fn status(&mut self) -> ProcessStatus {
        match self.child.try_wait() {
            Ok(Some(status)) => ProcessStatus::Exited(status.code()),
            Ok(None) => ProcessStatus::Running,
            // The handle is gone; treat as exited with unknown code.
            Err(_) => ProcessStatus::Exited(None),
        }
    }

    /// Sends the graceful stop signal (SIGTERM on Unix).
    #[cfg(unix)]
    pub(crate) fn signal_stop(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let _ = kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM);
    }

    /// Sends the graceful stop signal (no SIGTERM off Unix; hard kill).
    #[cfg(not(unix))]
    pub(crate) fn signal_stop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Resolves a bare executable name against `PATH`.
///
/// Returns the first matching file, or `None` when the tool is absent.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truck_spec_matches_invocation_contract() {
        let cfg = Config::default();
        let spec = LaunchSpec::truck(&cfg, 3, Path::new("routes/a.route"), "localhost");
        assert_eq!(spec.tag, "truck:3");
        assert_eq!(spec.args, vec!["--truck-id=3", "--route=routes/a.route"]);
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("build")));
        assert!(spec
            .env
            .iter()
            .any(|(k, v)| k == "MQTT_BROKER" && v == "localhost"));
        assert_eq!(spec.log_path, PathBuf::from("logs/truck_3.log"));
    }

    #[test]
    fn missing_binary_is_rejected_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec {
            tag: "truck:1".to_string(),
            program: dir.path().join("no-such-binary"),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            log_path: dir.path().join("t.log"),
        };
        let err = spec.spawn().unwrap_err();
        assert!(matches!(err, LaunchError::MissingBinary { .. }));
    }

    #[test]
    fn status_display_is_wire_stable() {
        assert_eq!(ProcessStatus::Running.to_string(), "running");
        assert_eq!(ProcessStatus::Exited(Some(0)).to_string(), "exited(0)");
        assert_eq!(ProcessStatus::Exited(Some(1)).to_string(), "exited(1)");
        assert_eq!(ProcessStatus::Exited(None).to_string(), "exited(signal)");
    }

    #[test]
    fn find_on_path_locates_common_tools() {
        assert!(find_on_path("sh").is_some());
        assert!(find_on_path("definitely-not-a-real-tool").is_none());
    }
}
