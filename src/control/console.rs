//! # Interactive operator console.
//!
//! Reads newline-terminated commands from the orchestrator's own stdin in a
//! dedicated task. Serves the same verb set as the socket server, plus
//! `help` and `exit`/`quit`, and prints human-readable output instead of
//! JSON.
//!
//! ## Rules
//! - Runs concurrently with the control server and the reaper; it never
//!   blocks either (all waits are async).
//! - `exit`/`quit` trigger the lifecycle controller; teardown itself happens
//!   in the orchestrator, not here.
//! - End-of-input (stdin closed) ends the console task silently; the
//!   orchestrator keeps running for socket clients.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::control::command::{Command, HELP_TEXT};
use crate::control::dispatch::Dispatcher;
use crate::core::Lifecycle;
use crate::error::CommandError;

/// Stdin command loop for a human operator.
pub struct Console {
    dispatcher: Arc<Dispatcher>,
    lifecycle: Arc<Lifecycle>,
}

impl Console {
    /// Creates a console bound to the shared dispatcher and lifecycle.
    pub fn new(dispatcher: Arc<Dispatcher>, lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            dispatcher,
            lifecycle,
        }
    }

    /// Runs until stdin closes or the lifecycle token cancels.
    pub async fn run(self) {
        let token = self.lifecycle.token();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("console ready. Use 'addtruck <id> <route>' or 'help'.");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(&line).await,
                    Ok(None) | Err(_) => {
                        debug!("console input closed");
                        break;
                    }
                }
            }
        }
    }

    async fn handle_line(&self, line: &str) {
        match Command::parse(line) {
            // Just a blank line at the prompt; stay quiet like a shell.
            Err(CommandError::Empty) => {}
            Err(err) => println!("{err}"),
            Ok(Command::Help) => println!("{HELP_TEXT}"),
            Ok(Command::Exit) => {
                println!("stopping fleet...");
                self.lifecycle.request_stop();
            }
            Ok(Command::List) => {
                for row in self.dispatcher.list().await {
                    println!("pid={} tag={} status={}", row.pid, row.tag, row.status);
                }
            }
            Ok(Command::AddTruck { id, route }) => {
                match self.dispatcher.add_truck(id, &route).await {
                    Ok(started) => println!(
                        "started truck id={} pid={} route={}",
                        started.id, started.pid, started.route
                    ),
                    Err(err) => println!("{err}"),
                }
            }
        }
    }
}
