//! # Subscriber trait for runtime events.
//!
//! Implementors receive every event published on the internal bus.
//!
//! ## Rules
//! - Subscribers run on the orchestrator's fan-out listener and are awaited
//!   sequentially; implementations must return promptly (bound their own
//!   I/O) so one subscriber cannot starve the others.
//! - Subscribers never publish replies; the bus is notification-only.

use async_trait::async_trait;

use crate::events::Event;

/// Consumer of runtime events.
#[async_trait]
pub trait Subscribe: Send + Sync {
    /// Stable subscriber name for logs.
    fn name(&self) -> &'static str;

    /// Handles one event.
    async fn on_event(&self, event: &Event);
}
