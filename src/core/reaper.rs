//! # Reaper: fixed-interval exit scan.
//!
//! Periodically asks the registry to remove entries whose child has exited
//! (logging tag and exit code). This is the only place entries are removed
//! due to natural process termination; requested stops go through
//! `terminate`/`shutdown_all`, and the registry's write lock keeps the two
//! paths mutually exclusive.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::process::ProcessRegistry;

/// Scans the registry every `interval` until the token cancels.
pub(crate) async fn run(
    registry: Arc<ProcessRegistry>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let reaped = registry.reap().await;
                if reaped > 0 {
                    debug!(reaped, "reaped exited processes");
                }
            }
        }
    }
    debug!("reaper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::events::Bus;
    use crate::process::LaunchSpec;

    #[tokio::test]
    async fn reaper_removes_exited_children() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProcessRegistry::new(Bus::new(16));

        registry
            .launch(LaunchSpec {
                tag: "short".to_string(),
                program: "true".into(),
                args: Vec::new(),
                cwd: None,
                env: Vec::new(),
                log_path: dir.path().join("short.log"),
            })
            .await
            .unwrap();

        let token = CancellationToken::new();
        let handle = tokio::spawn(run(
            Arc::clone(&registry),
            Duration::from_millis(50),
            token.clone(),
        ));

        // A few scan periods are plenty for `true` to exit and be reaped.
        for _ in 0..40 {
            time::sleep(Duration::from_millis(50)).await;
            if registry.is_empty().await {
                break;
            }
        }
        assert!(registry.is_empty().await);

        token.cancel();
        handle.await.unwrap();
    }
}
