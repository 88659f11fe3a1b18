//! # Acknowledgement forwarder.
//!
//! Watches the internal bus for [`EventKind::TruckLaunched`] and publishes
//! the `{"id","pid","route"}` acknowledgement to the configured topic.
//!
//! ## Rules
//! - Strictly best-effort: the wire reply for the originating `addtruck` has
//!   already been written by the time this runs; a publish failure is logged
//!   (as an [`EventKind::AckDropped`] event) and goes no further.
//! - The publisher implementation was selected once at startup; this
//!   subscriber never re-probes transports.

use std::sync::Arc;

use async_trait::async_trait;

use crate::control::AckPayload;
use crate::events::{Bus, Event, EventKind};
use crate::publish::AckPublisher;
use crate::subscribers::Subscribe;

/// Subscriber publishing fleet acknowledgements to the message bus.
pub struct AckForwarder {
    publisher: Arc<dyn AckPublisher>,
    topic: String,
    bus: Bus,
}

impl AckForwarder {
    /// Creates a forwarder publishing to `topic` via `publisher`.
    pub fn new(publisher: Arc<dyn AckPublisher>, topic: impl Into<String>, bus: Bus) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            bus,
        }
    }
}

#[async_trait]
impl Subscribe for AckForwarder {
    fn name(&self) -> &'static str {
        "ack-forwarder"
    }

    async fn on_event(&self, event: &Event) {
        if event.kind != EventKind::TruckLaunched {
            return;
        }
        let (Some(id), Some(pid)) = (event.truck_id, event.pid) else {
            return;
        };
        let payload = AckPayload {
            id,
            pid,
            route: event.route.as_deref().unwrap_or_default().to_string(),
        };
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(_) => return,
        };

        match self.publisher.publish(&self.topic, body).await {
            Ok(()) => {
                self.bus
                    .publish(Event::new(EventKind::AckPublished).with_truck_id(id));
            }
            Err(err) => {
                self.bus.publish(
                    Event::new(EventKind::AckDropped)
                        .with_truck_id(id)
                        .with_reason(err.to_string()),
                );
            }
        }
    }
}
