//! # Logging subscriber.
//!
//! Renders runtime events as structured `tracing` lines. This is the default
//! observability surface of the orchestrator; anything richer (metrics,
//! alerting) would be another [`Subscribe`] implementation.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber writing every event to the log.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::ProcessLaunched => {
                info!(seq = event.seq, tag = ?event.tag, pid = ?event.pid, "launched");
            }
            EventKind::ProcessExited => {
                info!(
                    seq = event.seq,
                    tag = ?event.tag,
                    pid = ?event.pid,
                    exit_code = ?event.exit_code,
                    "exited"
                );
            }
            EventKind::ProcessTerminated => {
                info!(seq = event.seq, tag = ?event.tag, pid = ?event.pid, "terminated");
            }
            EventKind::TruckLaunched => {
                info!(
                    seq = event.seq,
                    truck_id = ?event.truck_id,
                    pid = ?event.pid,
                    route = ?event.route,
                    "truck joined fleet"
                );
            }
            EventKind::AckPublished => {
                info!(seq = event.seq, truck_id = ?event.truck_id, "ack published");
            }
            EventKind::AckDropped => {
                warn!(
                    seq = event.seq,
                    truck_id = ?event.truck_id,
                    reason = ?event.reason,
                    "ack dropped"
                );
            }
            EventKind::ShutdownRequested => {
                info!(seq = event.seq, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(seq = event.seq, "all processes stopped within grace");
            }
            EventKind::GraceExceeded => {
                warn!(seq = event.seq, stuck = ?event.reason, "grace exceeded");
            }
        }
    }
}
