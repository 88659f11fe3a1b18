//! # Wire replies and the acknowledgement payload.
//!
//! Every socket request yields exactly one newline-terminated JSON line:
//!
//! ```text
//! {"status":"ok","id":3,"pid":4242,"route":"routes/a.route"}
//! {"status":"ok","procs":[{"tag":"truck:3","pid":4242,"status":"running"}]}
//! {"status":"error","reason":"truck id 3 already exists"}
//! ```
//!
//! [`AckPayload`] is the body published to the acknowledgement topic after a
//! successful `addtruck`; it mirrors the ok reply minus the status field.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::process::ProcessSummary;

/// Successful `addtruck` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruckStarted {
    /// Always `"ok"`.
    pub status: String,
    /// Truck id as requested.
    pub id: u32,
    /// OS pid of the new worker.
    pub pid: u32,
    /// Route path as requested.
    pub route: String,
}

impl TruckStarted {
    /// Builds the ok reply for a fresh launch.
    pub fn new(id: u32, pid: u32, route: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            id,
            pid,
            route: route.into(),
        }
    }
}

/// Successful `list` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessListing {
    /// Always `"ok"`.
    pub status: String,
    /// Snapshot of managed processes, sorted by tag.
    pub procs: Vec<ProcessSummary>,
}

impl ProcessListing {
    /// Wraps a registry snapshot in the ok envelope.
    pub fn new(procs: Vec<ProcessSummary>) -> Self {
        Self {
            status: "ok".to_string(),
            procs,
        }
    }
}

/// Failure reply, shared by every error class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Always `"error"`.
    pub status: String,
    /// Human-readable reason; stable per [`CommandError`] variant.
    pub reason: String,
}

impl ErrorReply {
    /// Builds an error reply with a literal reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&CommandError> for ErrorReply {
    fn from(err: &CommandError) -> Self {
        Self::new(err.to_string())
    }
}

/// Acknowledgement published to the bus after a successful `addtruck`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckPayload {
    /// Truck id.
    pub id: u32,
    /// Worker pid.
    pub pid: u32,
    /// Route path.
    pub route: String,
}

/// Serializes a reply as one newline-terminated wire line.
pub(crate) fn to_line<T: Serialize>(reply: &T) -> String {
    match serde_json::to_string(reply) {
        Ok(json) => format!("{json}\n"),
        // Reply types only contain strings and integers; this arm is
        // unreachable in practice but keeps the transport infallible.
        Err(_) => "{\"status\":\"error\",\"reason\":\"internal serialization failure\"}\n"
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_reply_shape() {
        let line = to_line(&TruckStarted::new(3, 4242, "routes/a.route"));
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["id"], 3);
        assert_eq!(value["pid"], 4242);
        assert_eq!(value["route"], "routes/a.route");
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn listing_reply_shape() {
        let rows = vec![ProcessSummary {
            tag: "truck:3".to_string(),
            pid: 4242,
            status: "running".to_string(),
        }];
        let line = to_line(&ProcessListing::new(rows));
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["procs"][0]["tag"], "truck:3");
        assert_eq!(value["procs"][0]["status"], "running");
    }

    #[test]
    fn error_reply_carries_reason_text() {
        let err = CommandError::AlreadyExists { id: 3 };
        let line = to_line(&ErrorReply::from(&err));
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["reason"], "truck id 3 already exists");
    }

    #[test]
    fn ack_payload_matches_publish_contract() {
        let payload = AckPayload {
            id: 1,
            pid: 99,
            route: "r.route".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"id":1,"pid":99,"route":"r.route"}"#);
    }
}
