//! Acknowledgement publishing to the external message bus.
//!
//! [`AckPublisher`] is a capability interface with interchangeable
//! implementations, selected **once** at startup and never re-probed per
//! call:
//!
//! - [`MqttPublisher`] — primary transport, a short-lived MQTT client per
//!   publish.
//! - [`MosquittoPub`] — fallback, shells out to the `mosquitto_pub` tool.
//! - [`NoopPublisher`] — selected in `mock` broker mode; publishes nothing.
//!
//! Publishing is strictly best-effort: failures are logged by the caller and
//! never affect a control-plane reply.

mod mqtt;
mod shell;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::PublishError;
use crate::process::find_on_path;

pub use mqtt::MqttPublisher;
pub use shell::MosquittoPub;

/// Best-effort publisher of acknowledgement messages.
#[async_trait]
pub trait AckPublisher: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &'static str;

    /// Publishes `payload` to `topic`. Errors are reported, never fatal.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), PublishError>;
}

/// Publisher for `mock` broker mode: accepts and discards everything.
pub struct NoopPublisher;

#[async_trait]
impl AckPublisher for NoopPublisher {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn publish(&self, _topic: &str, _payload: String) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Selects the acknowledgement transport for the given broker address.
///
/// Called once at startup:
/// - broker `mock` → [`NoopPublisher`];
/// - otherwise the MQTT client, when it can be constructed;
/// - otherwise `mosquitto_pub` when present on `PATH`;
/// - otherwise [`NoopPublisher`] with a warning (acks are dropped).
pub fn select_publisher(broker: &str, port: u16) -> Arc<dyn AckPublisher> {
    if crate::config::Config::is_mock_broker(broker) {
        info!("mock broker mode; acknowledgements disabled");
        return Arc::new(NoopPublisher);
    }
    match MqttPublisher::new(broker, port) {
        Ok(publisher) => Arc::new(publisher),
        Err(err) => {
            warn!(error = %err, "mqtt transport unavailable; trying mosquitto_pub");
            match find_on_path("mosquitto_pub") {
                Some(tool) => Arc::new(MosquittoPub::new(tool, broker)),
                None => {
                    warn!("no acknowledgement transport available; acks will be dropped");
                    Arc::new(NoopPublisher)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_publisher_accepts_everything() {
        let publisher = NoopPublisher;
        assert_eq!(publisher.name(), "noop");
        assert!(publisher
            .publish("/topic", "{}".to_string())
            .await
            .is_ok());
    }

    #[test]
    fn mock_broker_selects_noop() {
        let publisher = select_publisher("mock", 1883);
        assert_eq!(publisher.name(), "noop");
    }

    #[test]
    fn real_broker_selects_mqtt() {
        let publisher = select_publisher("localhost", 1883);
        assert_eq!(publisher.name(), "mqtt");
    }
}
