//! Error types used by the fleet orchestrator.
//!
//! One enum per failure domain:
//!
//! - [`RouteError`] — route file rejected by the validator.
//! - [`LaunchError`] — a child process could not be started or registered.
//! - [`CommandError`] — a control-plane request failed; always converted to a
//!   structured reply at the transport boundary, never fatal.
//! - [`PublishError`] — best-effort acknowledgement publish failed; logged only.
//! - [`StartupError`] — the orchestrator cannot come up; aborts with non-zero.
//!
//! All types provide `as_label` for stable snake_case log labels.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// # Route file validation failures.
///
/// Produced by [`route::validate`](crate::route::validate). Always recoverable:
/// the requested truck is simply not started.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RouteError {
    /// The route file does not exist.
    #[error("file not found: {path}")]
    NotFound {
        /// Path as given by the caller.
        path: String,
    },

    /// The route file exists but could not be read.
    #[error("failed to read file: {source}")]
    Unreadable {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Fewer than two lines qualified as waypoints.
    #[error("route must contain at least 2 valid waypoints (found {found})")]
    InsufficientWaypoints {
        /// Number of qualifying waypoint lines found.
        found: usize,
    },
}

impl RouteError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RouteError::NotFound { .. } => "route_not_found",
            RouteError::Unreadable { .. } => "route_unreadable",
            RouteError::InsufficientWaypoints { .. } => "route_insufficient_waypoints",
        }
    }
}

/// # Child process launch failures.
///
/// Raised by the launcher/registry. On any of these, no registry entry is
/// inserted and no process is left running.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// A live entry already holds this tag.
    #[error("tag '{tag}' already managed")]
    TagInUse {
        /// The contested tag.
        tag: String,
    },

    /// The configured executable does not exist on disk.
    #[error("binary not found at {path}")]
    MissingBinary {
        /// Path that was checked.
        path: String,
    },

    /// The log sink for the child could not be opened.
    #[error("failed to open log file {path}: {source}")]
    LogSink {
        /// Log file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The OS refused to create the process.
    #[error("failed to spawn '{tag}': {source}")]
    Spawn {
        /// Tag of the process that failed to start.
        tag: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::TagInUse { .. } => "launch_tag_in_use",
            LaunchError::MissingBinary { .. } => "launch_missing_binary",
            LaunchError::LogSink { .. } => "launch_log_sink",
            LaunchError::Spawn { .. } => "launch_spawn",
        }
    }
}

/// # Control-plane request failures.
///
/// Every variant maps to exactly one `{"status":"error","reason":...}` reply
/// (or one console line). The display strings are the wire `reason` texts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// The request line was empty after trimming.
    #[error("empty command")]
    Empty,

    /// The verb was recognized but arguments were missing.
    #[error("usage: {usage}")]
    Usage {
        /// Canonical usage string for the verb.
        usage: &'static str,
    },

    /// The truck id did not parse as a non-negative integer.
    #[error("invalid id '{given}'; must be a non-negative integer")]
    InvalidId {
        /// The offending token.
        given: String,
    },

    /// A live registry entry already exists for this truck id.
    #[error("truck id {id} already exists")]
    AlreadyExists {
        /// The requested truck id.
        id: u32,
    },

    /// The route file failed validation.
    #[error("route validation failed: {0}")]
    RouteInvalid(#[from] RouteError),

    /// The worker process could not be started.
    #[error("failed to start truck: {0}")]
    SpawnFailed(#[from] LaunchError),

    /// The verb is not part of the command set.
    #[error("unknown command")]
    Unknown {
        /// The verb as received.
        verb: String,
    },
}

impl CommandError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandError::Empty => "command_empty",
            CommandError::Usage { .. } => "command_usage",
            CommandError::InvalidId { .. } => "command_invalid_id",
            CommandError::AlreadyExists { .. } => "command_already_exists",
            CommandError::RouteInvalid(_) => "command_route_invalid",
            CommandError::SpawnFailed(_) => "command_spawn_failed",
            CommandError::Unknown { .. } => "command_unknown",
        }
    }
}

/// # Acknowledgement publish failures.
///
/// Strictly non-fatal: the registry state and the wire reply are already
/// committed by the time a publish is attempted.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PublishError {
    /// The MQTT client reported an error.
    #[error("mqtt publish failed: {0}")]
    Mqtt(String),

    /// The publish did not complete within the transport deadline.
    #[error("publish timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// `mosquitto_pub` ran but exited non-zero.
    #[error("mosquitto_pub exited with {status}")]
    Tool {
        /// Exit status of the helper tool.
        status: std::process::ExitStatus,
    },

    /// `mosquitto_pub` could not be executed at all.
    #[error("failed to run mosquitto_pub: {0}")]
    ToolSpawn(#[from] io::Error),
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::Mqtt(_) => "publish_mqtt",
            PublishError::Timeout { .. } => "publish_timeout",
            PublishError::Tool { .. } => "publish_tool",
            PublishError::ToolSpawn(_) => "publish_tool_spawn",
        }
    }
}

/// # Fatal startup failures.
///
/// Any of these aborts the orchestrator before (or while) it comes up; the
/// process exits non-zero.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StartupError {
    /// The per-run log directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    LogDir {
        /// Directory path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The control socket could not be bound (after stale-path removal).
    #[error("failed to bind control socket {path}: {source}")]
    SocketBind {
        /// Socket path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The requested build step failed.
    #[error("build step failed: {reason}")]
    Build {
        /// What went wrong (tool, exit status).
        reason: String,
    },
}
