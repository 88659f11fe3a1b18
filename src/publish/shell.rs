//! # Fallback acknowledgement transport: `mosquitto_pub`.
//!
//! Shells out to the mosquitto client tool. Selected at startup only when the
//! primary MQTT transport cannot be constructed and the tool is on `PATH`.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::PublishError;
use crate::publish::AckPublisher;

/// Shell-out acknowledgement publisher.
pub struct MosquittoPub {
    tool: PathBuf,
    host: String,
}

impl MosquittoPub {
    /// Creates a publisher invoking `tool` against `host`.
    pub fn new(tool: PathBuf, host: &str) -> Self {
        Self {
            tool,
            host: host.to_string(),
        }
    }
}

#[async_trait]
impl AckPublisher for MosquittoPub {
    fn name(&self) -> &'static str {
        "mosquitto_pub"
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), PublishError> {
        let status = Command::new(&self.tool)
            .args(["-h", &self.host, "-t", topic, "-m", &payload])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(PublishError::Tool { status })
        }
    }
}
