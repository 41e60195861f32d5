//! # Error Types
//!
//! Path syntax errors are caller errors: they fail fast, carry the offending
//! input verbatim, and are never recovered into data.

use thiserror::Error;

/// A path string could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed path '{path}' at offset {offset}: {reason}")]
pub struct MalformedPathError {
    /// The path string as supplied by the caller.
    pub path: String,
    /// Byte offset in `path` where parsing failed.
    pub offset: usize,
    /// What was wrong at that offset.
    pub reason: String,
}

impl MalformedPathError {
    pub(crate) fn new(path: &str, offset: usize, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            offset,
            reason: reason.into(),
        }
    }
}
