//! # Process registry - lock-guarded table of managed children.
//!
//! The registry is the **only** mutable state shared between the concurrent
//! actors (control-plane connection handlers, the interactive console, the
//! reaper, the lifecycle controller). Every read or write goes through one
//! `RwLock`, which is what makes the uniqueness invariant hold under
//! concurrent `addtruck` and concurrent reap-on-exit.
//!
//! ## Rules
//! - At most one live entry per tag. [`ProcessRegistry::launch`] holds the
//!   write lock across the presence check, the spawn, and the insert, so two
//!   racing launches for one tag cannot both succeed — and the loser never
//!   spawns a process at all.
//! - Entries are removed in exactly two places: [`ProcessRegistry::reap`]
//!   (natural exit) and [`ProcessRegistry::terminate`] /
//!   [`ProcessRegistry::shutdown_all`] (requested stop). Both remove under
//!   the write lock, so an entry is taken by exactly one of them.
//! - Dropping a removed entry closes its log sink.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::config::BROKER_TAG;
use crate::error::LaunchError;
use crate::events::{Bus, Event, EventKind};
use crate::process::launch::{LaunchSpec, ManagedProcess, ProcessStatus};

/// Snapshot row returned by [`ProcessRegistry::list`]; also the wire shape of
/// one entry in the `list` reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Registry tag.
    pub tag: String,
    /// OS process id.
    pub pid: u32,
    /// `running` or `exited(<code>)`.
    pub status: String,
}

/// Receipt for a successful launch.
#[derive(Debug, Clone)]
pub struct LaunchReceipt {
    /// Tag under which the child was registered.
    pub tag: String,
    /// OS process id of the new child.
    pub pid: u32,
}

/// Lock-guarded table of managed child processes.
pub struct ProcessRegistry {
    table: RwLock<HashMap<String, ManagedProcess>>,
    bus: Bus,
}

impl ProcessRegistry {
    /// Creates an empty registry publishing to the given bus.
    pub fn new(bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            table: RwLock::new(HashMap::new()),
            bus,
        })
    }

    /// Spawns the child described by `spec` and registers it.
    ///
    /// Atomic with respect to other launches: the presence check, the spawn,
    /// and the insert happen under one write lock. On error nothing is
    /// inserted and no process is running.
    pub async fn launch(&self, spec: LaunchSpec) -> Result<LaunchReceipt, LaunchError> {
        let mut table = self.table.write().await;
        if table.contains_key(&spec.tag) {
            return Err(LaunchError::TagInUse {
                tag: spec.tag.clone(),
            });
        }

        let entry = spec.spawn()?;
        let receipt = LaunchReceipt {
            tag: entry.tag().to_string(),
            pid: entry.pid(),
        };
        table.insert(receipt.tag.clone(), entry);
        drop(table);

        info!(tag = %receipt.tag, pid = receipt.pid, "process started");
        self.bus.publish(
            Event::new(EventKind::ProcessLaunched)
                .with_tag(receipt.tag.as_str())
                .with_pid(receipt.pid),
        );
        Ok(receipt)
    }

    /// Returns `true` when a live entry holds `tag`.
    pub async fn contains(&self, tag: &str) -> bool {
        self.table.read().await.contains_key(tag)
    }

    /// Returns `true` when no entries are managed.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    /// Snapshot of all entries, sorted by tag.
    ///
    /// Takes the write lock: deriving a status polls the child handle, which
    /// needs exclusive access.
    pub async fn list(&self) -> Vec<ProcessSummary> {
        let mut table = self.table.write().await;
        let mut rows: Vec<ProcessSummary> = table
            .values_mut()
            .map(|entry| ProcessSummary {
                tag: entry.tag().to_string(),
                pid: entry.pid(),
                status: entry.status().to_string(),
            })
            .collect();
        rows.sort_unstable_by(|a, b| a.tag.cmp(&b.tag));
        rows
    }

    /// Removes every entry whose child has exited; logs tag and exit code.
    ///
    /// This is the only removal path for natural termination. Returns the
    /// number of entries reaped.
    pub async fn reap(&self) -> usize {
        let mut table = self.table.write().await;
        let exited: Vec<(String, Option<i32>)> = table
            .values_mut()
            .filter_map(|entry| match entry.status() {
                ProcessStatus::Exited(code) => Some((entry.tag().to_string(), code)),
                ProcessStatus::Running => None,
            })
            .collect();

        let mut reaped = 0;
        for (tag, code) in exited {
            if let Some(entry) = table.remove(&tag) {
                info!(tag = %tag, pid = entry.pid(), exit_code = ?code, "process exited");
                self.bus.publish(
                    Event::new(EventKind::ProcessExited)
                        .with_tag(tag.as_str())
                        .with_pid(entry.pid())
                        .with_exit_code(code),
                );
                reaped += 1;
                // entry dropped here; log sink closes with it
            }
        }
        reaped
    }

    /// Stops one entry: graceful signal, bounded wait, force-kill, removal.
    ///
    /// Returns `false` when no entry holds `tag`.
    pub async fn terminate(&self, tag: &str, grace: Duration) -> bool {
        let Some(mut entry) = self.table.write().await.remove(tag) else {
            return false;
        };
        let pid = entry.pid();
        let deadline = Instant::now() + grace;
        if stop_entry(&mut entry, deadline).await == StopOutcome::Forced {
            warn!(tag = %tag, pid, "process did not stop within grace; killed");
        }
        info!(tag = %tag, pid, "process terminated");
        self.bus.publish(
            Event::new(EventKind::ProcessTerminated)
                .with_tag(tag)
                .with_pid(pid),
        );
        true
    }

    /// Stops everything: all non-broker entries first, then the broker.
    ///
    /// Per-entry failures are logged and never abort the sweep. Publishes
    /// [`EventKind::AllStoppedWithin`] or [`EventKind::GraceExceeded`]
    /// depending on whether any child had to be killed.
    pub async fn shutdown_all(&self, grace: Duration) {
        let drained: Vec<ManagedProcess> = {
            let mut table = self.table.write().await;
            table.drain().map(|(_, entry)| entry).collect()
        };
        if drained.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            return;
        }

        let (mut brokers, mut children): (Vec<_>, Vec<_>) = drained
            .into_iter()
            .partition(|entry| entry.tag() == BROKER_TAG);

        let mut stuck = Vec::new();
        stop_batch(&mut children, grace, &mut stuck).await;
        stop_batch(&mut brokers, grace, &mut stuck).await;

        if stuck.is_empty() {
            info!("all managed processes stopped within grace");
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
        } else {
            warn!(stuck = ?stuck, "grace exceeded; stuck processes were killed");
            self.bus.publish(
                Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
            );
        }
        // drained entries drop here, closing every log sink
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopOutcome {
    AlreadyExited,
    Graceful,
    Forced,
}

/// Signals one entry and waits for it until `deadline`; kills it after.
async fn stop_entry(entry: &mut ManagedProcess, deadline: Instant) -> StopOutcome {
    if matches!(entry.status(), ProcessStatus::Exited(_)) {
        return StopOutcome::AlreadyExited;
    }
    entry.signal_stop();
    let remaining = deadline.saturating_duration_since(Instant::now());
    match time::timeout(remaining, entry.child.wait()).await {
        Ok(_) => StopOutcome::Graceful,
        Err(_elapsed) => {
            let _ = entry.child.start_kill();
            let _ = entry.child.wait().await;
            StopOutcome::Forced
        }
    }
}

/// Stops a batch of entries against one shared deadline.
///
/// Signals every running child first, then waits each one out; stragglers are
/// killed and recorded in `stuck`.
async fn stop_batch(entries: &mut [ManagedProcess], grace: Duration, stuck: &mut Vec<String>) {
    if entries.is_empty() {
        return;
    }
    let deadline = Instant::now() + grace;
    for entry in entries.iter_mut() {
        if matches!(entry.status(), ProcessStatus::Running) {
            info!(tag = %entry.tag(), pid = entry.pid(), "stopping process");
            entry.signal_stop();
        }
    }
    for entry in entries.iter_mut() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match time::timeout(remaining, entry.child.wait()).await {
            Ok(_) => {}
            Err(_elapsed) => {
                warn!(tag = %entry.tag(), pid = entry.pid(), "killing process after grace");
                let _ = entry.child.start_kill();
                let _ = entry.child.wait().await;
                stuck.push(entry.tag().to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn spec(dir: &Path, tag: &str, program: &str, args: &[&str]) -> LaunchSpec {
        LaunchSpec {
            tag: tag.to_string(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
            env: Vec::new(),
            log_path: dir.join(format!("{}.log", tag.replace(':', "_"))),
        }
    }

    fn registry() -> Arc<ProcessRegistry> {
        ProcessRegistry::new(Bus::new(64))
    }

    #[tokio::test]
    async fn launch_registers_running_entry() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();

        let receipt = reg
            .launch(spec(dir.path(), "truck:1", "sleep", &["5"]))
            .await
            .unwrap();
        assert_eq!(receipt.tag, "truck:1");
        assert!(receipt.pid > 0);

        let rows = reg.list().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tag, "truck:1");
        assert_eq!(rows[0].status, "running");

        assert!(reg.terminate("truck:1", Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn duplicate_tag_rejected_without_second_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();

        let first = reg
            .launch(spec(dir.path(), "truck:2", "sleep", &["5"]))
            .await
            .unwrap();
        let err = reg
            .launch(spec(dir.path(), "truck:2", "sleep", &["5"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::TagInUse { .. }));

        let rows = reg.list().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pid, first.pid);

        reg.terminate("truck:2", Duration::from_millis(500)).await;
    }

    #[tokio::test]
    async fn failed_spawn_inserts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();

        let bad = LaunchSpec {
            program: dir.path().join("missing-binary"),
            ..spec(dir.path(), "truck:3", "unused", &[])
        };
        assert!(reg.launch(bad).await.is_err());
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn reap_removes_exited_entries_only() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();

        reg.launch(spec(dir.path(), "short", "true", &[]))
            .await
            .unwrap();
        reg.launch(spec(dir.path(), "long", "sleep", &["5"]))
            .await
            .unwrap();

        // give the short-lived child time to exit
        time::sleep(Duration::from_millis(300)).await;

        let reaped = reg.reap().await;
        assert_eq!(reaped, 1);

        let rows = reg.list().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tag, "long");

        reg.terminate("long", Duration::from_millis(500)).await;
    }

    #[tokio::test]
    async fn terminate_unknown_tag_reports_absent() {
        let reg = registry();
        assert!(!reg.terminate("truck:9", Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn concurrent_launches_distinct_tags_all_register() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();

        let mut handles = Vec::new();
        for id in 0..8u32 {
            let reg = Arc::clone(&reg);
            let s = spec(dir.path(), &format!("truck:{id}"), "sleep", &["5"]);
            handles.push(tokio::spawn(async move { reg.launch(s).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(reg.list().await.len(), 8);
        reg.shutdown_all(Duration::from_secs(2)).await;
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_launches_same_tag_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();

        let mut handles = Vec::new();
        for attempt in 0..8u32 {
            let reg = Arc::clone(&reg);
            let mut s = spec(dir.path(), "truck:7", "sleep", &["5"]);
            s.log_path = dir.path().join(format!("attempt_{attempt}.log"));
            handles.push(tokio::spawn(async move { reg.launch(s).await }));
        }
        let mut ok = 0;
        let mut in_use = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(LaunchError::TagInUse { .. }) => in_use += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(in_use, 7);
        assert_eq!(reg.list().await.len(), 1);

        reg.terminate("truck:7", Duration::from_millis(500)).await;
    }

    #[tokio::test]
    async fn shutdown_all_drains_registry_and_closes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry();

        reg.launch(spec(dir.path(), "truck:1", "sleep", &["30"]))
            .await
            .unwrap();
        reg.launch(spec(dir.path(), "broker", "sleep", &["30"]))
            .await
            .unwrap();

        reg.shutdown_all(Duration::from_secs(2)).await;
        assert!(reg.is_empty().await);
        assert!(reg.list().await.is_empty());
    }
}
