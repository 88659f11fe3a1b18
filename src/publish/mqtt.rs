//! # Primary acknowledgement transport: MQTT.
//!
//! One short-lived client per publish, mirroring a fire-and-forget
//! `publish single` call: connect, enqueue the QoS-0 publish, drive the event
//! loop until the packet leaves the socket, disconnect. The whole exchange is
//! bounded by [`PUBLISH_TIMEOUT`].

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event as MqttEvent, MqttOptions, Outgoing, QoS};

use crate::error::PublishError;
use crate::publish::AckPublisher;

/// Deadline for a single connect-publish-flush exchange.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// MQTT acknowledgement publisher.
pub struct MqttPublisher {
    host: String,
    port: u16,
}

impl MqttPublisher {
    /// Creates a publisher for `host:port`.
    ///
    /// # Errors
    /// [`PublishError::Mqtt`] when the host is unusable (empty), letting the
    /// startup selector fall back to the shell transport.
    pub fn new(host: &str, port: u16) -> Result<Self, PublishError> {
        if host.trim().is_empty() {
            return Err(PublishError::Mqtt("empty broker host".to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

#[async_trait]
impl AckPublisher for MqttPublisher {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), PublishError> {
        let client_id = format!("fleetvisor-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(2));

        let (client, mut eventloop) = AsyncClient::new(options, 8);

        let exchange = async {
            client
                .publish(topic, QoS::AtMostOnce, false, payload.into_bytes())
                .await
                .map_err(|err| PublishError::Mqtt(err.to_string()))?;

            // Drive the event loop until the publish is flushed to the socket;
            // QoS 0 gets no ack, so the outgoing packet is the completion signal.
            loop {
                match eventloop.poll().await {
                    Ok(MqttEvent::Outgoing(Outgoing::Publish(_))) => break Ok(()),
                    Ok(_) => continue,
                    Err(err) => break Err(PublishError::Mqtt(err.to_string())),
                }
            }
        };

        let result = match tokio::time::timeout(PUBLISH_TIMEOUT, exchange).await {
            Ok(result) => result,
            Err(_elapsed) => Err(PublishError::Timeout {
                timeout: PUBLISH_TIMEOUT,
            }),
        };
        let _ = client.disconnect().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_is_rejected_at_construction() {
        assert!(MqttPublisher::new("", 1883).is_err());
        assert!(MqttPublisher::new("  ", 1883).is_err());
        assert!(MqttPublisher::new("localhost", 1883).is_ok());
    }

    #[tokio::test]
    async fn unreachable_broker_fails_within_deadline() {
        // Reserved TEST-NET-1 address; nothing listens there.
        let publisher = MqttPublisher::new("192.0.2.1", 1883).unwrap();
        let start = std::time::Instant::now();
        let result = publisher.publish("/t", "{}".to_string()).await;
        assert!(result.is_err());
        assert!(start.elapsed() < PUBLISH_TIMEOUT + Duration::from_secs(1));
    }
}
