//! # Control-plane server over a local unix socket.
//!
//! Binds a [`UnixListener`] to a filesystem path (removing any stale socket
//! first; a bind failure after that is a fatal startup error), then accepts
//! connections until the lifecycle token cancels. Each connection is served
//! by its own task, so one slow client never blocks acceptance of the next.
//!
//! ## Per-connection protocol
//! - Read bytes until newline or end-of-stream (capped at 64 KiB).
//! - Decode as UTF-8, dropping invalid bytes; trim whitespace.
//! - Dispatch; write exactly one newline-terminated JSON reply; close.
//!
//! Every parse/validation/launch failure becomes a structured error reply.
//! Nothing a peer sends can take down the accept loop or another connection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::control::command::Command;
use crate::control::dispatch::Dispatcher;
use crate::control::response::{to_line, ErrorReply, ProcessListing};
use crate::error::StartupError;

/// Upper bound on one request line; a peer streaming garbage cannot grow the
/// buffer past this.
const MAX_REQUEST_BYTES: u64 = 64 * 1024;

/// Unix-socket control-plane server.
pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
    dispatcher: Arc<Dispatcher>,
}

impl ControlServer {
    /// Removes any stale socket at `path` and binds a fresh listener.
    ///
    /// # Errors
    /// [`StartupError::SocketBind`] when binding fails even after stale-path
    /// removal; the orchestrator must not come up without its control plane.
    pub fn bind(path: &Path, dispatcher: Arc<Dispatcher>) -> Result<Self, StartupError> {
        if path.exists() {
            // Stale socket from a previous run; errors surface at bind below.
            let _ = std::fs::remove_file(path);
        }
        let listener = UnixListener::bind(path).map_err(|source| StartupError::SocketBind {
            path: path.display().to_string(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o660));
        }

        info!(path = %path.display(), "control socket listening");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
            dispatcher,
        })
    }

    /// Socket path this server is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts connections until the token cancels.
    pub async fn run(self, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        tokio::spawn(async move {
                            handle_connection(stream, dispatcher).await;
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "control socket accept failed");
                    }
                }
            }
        }
        debug!("control server stopped accepting");
    }
}

/// Serves one connection: one request line, one reply line, close.
async fn handle_connection(stream: UnixStream, dispatcher: Arc<Dispatcher>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half.take(MAX_REQUEST_BYTES));

    let mut buf = Vec::new();
    if let Err(err) = reader.read_until(b'\n', &mut buf).await {
        debug!(error = %err, "control connection read failed");
        return;
    }

    // Invalid UTF-8 is dropped, never fatal.
    let line = String::from_utf8_lossy(&buf).replace('\u{FFFD}', "");
    let reply = dispatch_line(line.trim(), &dispatcher).await;

    if let Err(err) = write_half.write_all(reply.as_bytes()).await {
        // Peer went away before the reply; local work is already committed.
        debug!(error = %err, "control reply not delivered");
    }
    let _ = write_half.shutdown().await;
}

/// Maps one request line to one reply line.
async fn dispatch_line(line: &str, dispatcher: &Dispatcher) -> String {
    match Command::parse(line) {
        Ok(Command::AddTruck { id, route }) => match dispatcher.add_truck(id, &route).await {
            Ok(started) => to_line(&started),
            Err(err) => {
                debug!(label = err.as_label(), "addtruck rejected");
                to_line(&ErrorReply::from(&err))
            }
        },
        Ok(Command::List) => to_line(&ProcessListing::new(dispatcher.list().await)),
        // Console-only verbs are not part of the socket surface.
        Ok(Command::Help | Command::Exit) => to_line(&ErrorReply::new("unknown command")),
        Err(err) => to_line(&ErrorReply::from(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::time::Duration;

    use crate::config::Config;
    use crate::events::Bus;
    use crate::process::ProcessRegistry;

    struct Harness {
        dispatcher: Arc<Dispatcher>,
        socket: PathBuf,
        token: CancellationToken,
        _dir: tempfile::TempDir,
    }

    async fn start_server() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.log_dir = dir.path().to_path_buf();
        cfg.truck_bin = "sleep".into();
        cfg.truck_cwd = dir.path().to_path_buf();
        let cfg = Arc::new(cfg);

        let bus = Bus::new(64);
        let registry = ProcessRegistry::new(bus.clone());
        let dispatcher = Dispatcher::new(cfg, registry, bus, "mock");

        let socket = dir.path().join("control.sock");
        let server = ControlServer::bind(&socket, Arc::clone(&dispatcher)).unwrap();
        let token = CancellationToken::new();
        tokio::spawn(server.run(token.clone()));

        Harness {
            dispatcher,
            socket,
            token,
            _dir: dir,
        }
    }

    async fn request(socket: &Path, line: &str) -> serde_json::Value {
        let mut stream = UnixStream::connect(socket).await.unwrap();
        stream.write_all(line.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        let mut reply = String::new();
        let mut reader = BufReader::new(stream);
        reader.read_line(&mut reply).await.unwrap();
        serde_json::from_str(reply.trim()).unwrap()
    }

    fn write_route(harness: &Harness, name: &str) -> PathBuf {
        let path = harness._dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"0 0\n10 10\n").unwrap();
        path
    }

    #[tokio::test]
    async fn list_with_no_processes_is_ok_and_empty() {
        let harness = start_server().await;
        let reply = request(&harness.socket, "list\n").await;
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["procs"].as_array().unwrap().len(), 0);
        harness.token.cancel();
    }

    #[tokio::test]
    async fn addtruck_roundtrip_registers_worker() {
        let harness = start_server().await;
        let route = write_route(&harness, "a.route");

        let line = format!("addtruck 3 {}\n", route.display());
        let reply = request(&harness.socket, &line).await;
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["id"], 3);
        assert!(reply["pid"].as_u64().unwrap() > 0);

        let listing = request(&harness.socket, "list\n").await;
        let procs = listing["procs"].as_array().unwrap();
        assert_eq!(procs.len(), 1);
        assert_eq!(procs[0]["tag"], "truck:3");

        harness
            .dispatcher
            .registry()
            .terminate("truck:3", Duration::from_millis(500))
            .await;
        harness.token.cancel();
    }

    #[tokio::test]
    async fn duplicate_addtruck_is_rejected() {
        let harness = start_server().await;
        let route = write_route(&harness, "a.route");
        let line = format!("addtruck 4 {}\n", route.display());

        let first = request(&harness.socket, &line).await;
        assert_eq!(first["status"], "ok");
        let second = request(&harness.socket, &line).await;
        assert_eq!(second["status"], "error");
        assert_eq!(second["reason"], "truck id 4 already exists");

        harness
            .dispatcher
            .registry()
            .terminate("truck:4", Duration::from_millis(500))
            .await;
        harness.token.cancel();
    }

    #[tokio::test]
    async fn malformed_requests_leave_registry_unchanged() {
        let harness = start_server().await;

        for (input, expected_reason) in [
            ("\n", "empty command"),
            ("addtruck\n", "usage: addtruck <id> <route>"),
            (
                "addtruck abc route\n",
                "invalid id 'abc'; must be a non-negative integer",
            ),
            ("bogus\n", "unknown command"),
            ("exit\n", "unknown command"),
        ] {
            let reply = request(&harness.socket, input).await;
            assert_eq!(reply["status"], "error", "input: {input:?}");
            assert_eq!(reply["reason"], expected_reason, "input: {input:?}");
        }

        assert!(harness.dispatcher.registry().is_empty().await);
        harness.token.cancel();
    }

    #[tokio::test]
    async fn missing_route_is_structured_error() {
        let harness = start_server().await;
        let reply = request(&harness.socket, "addtruck 1 nope.route\n").await;
        assert_eq!(reply["status"], "error");
        assert!(reply["reason"]
            .as_str()
            .unwrap()
            .starts_with("route validation failed"));
        assert!(harness.dispatcher.registry().is_empty().await);
        harness.token.cancel();
    }

    #[tokio::test]
    async fn request_without_trailing_newline_is_served_on_eof() {
        let harness = start_server().await;
        let reply = request(&harness.socket, "list").await;
        assert_eq!(reply["status"], "ok");
        harness.token.cancel();
    }

    #[tokio::test]
    async fn concurrent_addtruck_same_id_single_success() {
        let harness = start_server().await;
        let route = write_route(&harness, "a.route");
        let line = format!("addtruck 8 {}\n", route.display());

        let mut handles = Vec::new();
        for _ in 0..6 {
            let socket = harness.socket.clone();
            let line = line.clone();
            handles.push(tokio::spawn(async move { request(&socket, &line).await }));
        }
        let mut ok = 0;
        let mut errors = 0;
        for handle in handles {
            let reply = handle.await.unwrap();
            if reply["status"] == "ok" {
                ok += 1;
            } else {
                assert_eq!(reply["reason"], "truck id 8 already exists");
                errors += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(errors, 5);
        assert_eq!(harness.dispatcher.list().await.len(), 1);

        harness
            .dispatcher
            .registry()
            .terminate("truck:8", Duration::from_millis(500))
            .await;
        harness.token.cancel();
    }

    #[tokio::test]
    async fn concurrent_addtruck_distinct_ids_all_succeed() {
        let harness = start_server().await;
        let route = write_route(&harness, "a.route");

        let mut handles = Vec::new();
        for id in 0..5u32 {
            let socket = harness.socket.clone();
            let line = format!("addtruck {id} {}\n", route.display());
            handles.push(tokio::spawn(async move { request(&socket, &line).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap()["status"], "ok");
        }
        assert_eq!(harness.dispatcher.list().await.len(), 5);

        harness
            .dispatcher
            .registry()
            .shutdown_all(Duration::from_secs(2))
            .await;
        harness.token.cancel();
    }

    #[tokio::test]
    async fn bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("stale.sock");
        std::fs::write(&socket, b"stale").unwrap();

        let cfg = Arc::new(Config::default());
        let bus = Bus::new(8);
        let registry = ProcessRegistry::new(bus.clone());
        let dispatcher = Dispatcher::new(cfg, registry, bus, "mock");

        let server = ControlServer::bind(&socket, dispatcher).unwrap();
        assert_eq!(server.path(), socket.as_path());
    }
}
