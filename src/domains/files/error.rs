//! Listing error types.

use std::io;

use thiserror::Error;

use crate::core::security::PathSecurityError;

/// Reasons a directory listing can fail.
///
/// The display strings are the messages returned to callers.
#[derive(Debug, Error)]
pub enum ListError {
    /// The path is outside the allow-list or resolves outside the base.
    #[error("Path not allowed. Must be in: {}", .allowed.join(", "))]
    NotAllowed {
        allowed: Vec<String>,
        #[source]
        reason: PathSecurityError,
    },

    /// The target does not exist.
    #[error("Directory does not exist: {0}")]
    NotFound(String),

    /// The target exists but is not a directory.
    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    /// The OS refused read access.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The name pattern could not be parsed.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Any other filesystem failure.
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl ListError {
    /// Classify an I/O error raised while reading `path`.
    pub fn from_io(error: io::Error, path: &str) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            _ => Self::Io(error),
        }
    }
}
