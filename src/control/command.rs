//! # Control-plane command set.
//!
//! [`Command`] is the closed set of verbs understood by both transports,
//! produced by one dedicated parser. Dispatchers match on it exhaustively;
//! adding a verb means adding a variant, not another string comparison.
//!
//! ## Grammar
//! One line, whitespace-separated tokens, first token is the verb
//! (case-insensitive):
//!
//! ```text
//! addtruck <id> <route>
//! list
//! help
//! exit | quit
//! ```

use std::path::PathBuf;

use crate::error::CommandError;

/// Usage string for `addtruck`, echoed verbatim in error replies.
pub const ADDTRUCK_USAGE: &str = "addtruck <id> <route>";

/// Help text shown by the console `help` verb.
pub const HELP_TEXT: &str = "commands: addtruck <id> <route> | list | help | exit";

/// A parsed control-plane command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new truck worker with the given id and route file.
    AddTruck {
        /// Truck id; non-negative, unique among live trucks.
        id: u32,
        /// Path of the route file to validate and pass to the worker.
        route: PathBuf,
    },
    /// Snapshot of all managed processes.
    List,
    /// Show the command summary (console only).
    Help,
    /// Stop the orchestrator (console only).
    Exit,
}

impl Command {
    /// Parses one request line into a command.
    ///
    /// # Errors
    /// - [`CommandError::Empty`] — nothing left after trimming.
    /// - [`CommandError::Usage`] — `addtruck` with missing arguments.
    /// - [`CommandError::InvalidId`] — id is not a non-negative integer.
    /// - [`CommandError::Unknown`] — unrecognized verb.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let Some(verb) = tokens.next() else {
            return Err(CommandError::Empty);
        };

        match verb.to_ascii_lowercase().as_str() {
            "addtruck" => {
                let (Some(id), Some(route)) = (tokens.next(), tokens.next()) else {
                    return Err(CommandError::Usage {
                        usage: ADDTRUCK_USAGE,
                    });
                };
                let id: u32 = id.parse().map_err(|_| CommandError::InvalidId {
                    given: id.to_string(),
                })?;
                Ok(Command::AddTruck {
                    id,
                    route: PathBuf::from(route),
                })
            }
            "list" => Ok(Command::List),
            "help" => Ok(Command::Help),
            "exit" | "quit" => Ok(Command::Exit),
            _ => Err(CommandError::Unknown {
                verb: verb.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addtruck_parses_id_and_route() {
        let cmd = Command::parse("addtruck 3 routes/a.route").unwrap();
        assert_eq!(
            cmd,
            Command::AddTruck {
                id: 3,
                route: PathBuf::from("routes/a.route"),
            }
        );
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(Command::parse("LIST").unwrap(), Command::List);
        assert_eq!(Command::parse("Quit").unwrap(), Command::Exit);
        assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
        assert_eq!(Command::parse("HELP").unwrap(), Command::Help);
    }

    #[test]
    fn empty_line_is_empty_command() {
        assert!(matches!(Command::parse(""), Err(CommandError::Empty)));
        assert!(matches!(Command::parse("   \t "), Err(CommandError::Empty)));
    }

    #[test]
    fn addtruck_without_arguments_is_usage_error() {
        assert!(matches!(
            Command::parse("addtruck"),
            Err(CommandError::Usage { .. })
        ));
        assert!(matches!(
            Command::parse("addtruck 5"),
            Err(CommandError::Usage { .. })
        ));
    }

    #[test]
    fn non_numeric_or_negative_id_is_invalid() {
        assert!(matches!(
            Command::parse("addtruck abc route"),
            Err(CommandError::InvalidId { .. })
        ));
        assert!(matches!(
            Command::parse("addtruck -1 route"),
            Err(CommandError::InvalidId { .. })
        ));
    }

    #[test]
    fn unknown_verb_is_rejected() {
        assert!(matches!(
            Command::parse("bogus"),
            Err(CommandError::Unknown { .. })
        ));
    }

    #[test]
    fn extra_tokens_after_route_are_ignored() {
        let cmd = Command::parse("addtruck 1 r.route trailing words").unwrap();
        assert!(matches!(cmd, Command::AddTruck { id: 1, .. }));
    }
}
