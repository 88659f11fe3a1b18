//! # Route file validation.
//!
//! A route file is plain text, one waypoint per line: `x y [speed]`.
//! Blank lines and `#`-prefixed comment lines are ignored. A line qualifies
//! as a waypoint iff its first two whitespace-separated tokens both parse as
//! numbers; extra columns are allowed and ignored.
//!
//! ## Rules
//! - A route is accepted iff it contains **at least 2** qualifying waypoints.
//! - [`validate`] is pure: no side effects, safe to call repeatedly and
//!   concurrently.
//! - Validation runs **before** any process is launched; an invalid route
//!   never consumes registry or OS resources.

use std::path::Path;

use crate::error::RouteError;

/// Minimum number of qualifying waypoint lines for a usable route.
const MIN_WAYPOINTS: usize = 2;

/// Validates that `path` exists, is readable, and contains at least two
/// numeric waypoints.
///
/// # Errors
/// - [`RouteError::NotFound`] — the file does not exist.
/// - [`RouteError::Unreadable`] — the file exists but could not be read.
/// - [`RouteError::InsufficientWaypoints`] — fewer than 2 qualifying lines.
pub fn validate(path: &Path) -> Result<(), RouteError> {
    if !path.exists() {
        return Err(RouteError::NotFound {
            path: path.display().to_string(),
        });
    }
    let contents =
        std::fs::read_to_string(path).map_err(|source| RouteError::Unreadable { source })?;

    let found = count_waypoints(&contents);
    if found < MIN_WAYPOINTS {
        return Err(RouteError::InsufficientWaypoints { found });
    }
    Ok(())
}

/// Counts lines that qualify as waypoints (first two tokens numeric).
fn count_waypoints(contents: &str) -> usize {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some(x), Some(y)) => x.parse::<f64>().is_ok() && y.parse::<f64>().is_ok(),
                _ => false,
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn route_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = validate(Path::new("no/such/file.route")).unwrap_err();
        assert!(matches!(err, RouteError::NotFound { .. }));
    }

    #[test]
    fn two_waypoints_accepted() {
        let file = route_file("0 0\n10 10\n");
        assert!(validate(file.path()).is_ok());
    }

    #[test]
    fn one_waypoint_rejected() {
        let file = route_file("0 0\n");
        let err = validate(file.path()).unwrap_err();
        assert!(matches!(
            err,
            RouteError::InsufficientWaypoints { found: 1 }
        ));
    }

    #[test]
    fn empty_file_rejected() {
        let file = route_file("");
        let err = validate(file.path()).unwrap_err();
        assert!(matches!(
            err,
            RouteError::InsufficientWaypoints { found: 0 }
        ));
    }

    #[test]
    fn comments_and_blanks_do_not_count() {
        let file = route_file("# header\n\n   \n# 1 2\n5 5\n");
        let err = validate(file.path()).unwrap_err();
        assert!(matches!(
            err,
            RouteError::InsufficientWaypoints { found: 1 }
        ));
    }

    #[test]
    fn non_numeric_lines_do_not_count() {
        let file = route_file("abc def\n1 x\nx 1\n1\n2 3\n4 5\n");
        assert!(validate(file.path()).is_ok());
        assert_eq!(count_waypoints("abc def\n1 x\nx 1\n1\n2 3\n4 5\n"), 2);
    }

    #[test]
    fn speed_column_and_extra_tokens_allowed() {
        let file = route_file("0.0 0.0 2.5\n10 -3 1.0 trailing junk\n");
        assert!(validate(file.path()).is_ok());
    }

    #[test]
    fn noise_heavy_file_with_two_waypoints_accepted() {
        let file = route_file("# route\n\nnope\n1 2 3\n# mid comment\n\n4 5\nword\n");
        assert!(validate(file.path()).is_ok());
    }
}
