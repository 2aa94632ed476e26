//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::EnvError;

/// Map domain errors to a single line for CLI output.
pub fn map_error(e: &EnvError) -> String {
    match e {
        EnvError::Notification { written, .. } => format!(
            "{} ({} key(s) were stored)",
            e,
            written.len()
        ),
        _ => e.to_string(),
    }
}
