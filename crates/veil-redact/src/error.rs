//! Error types for the redaction crate.

use thiserror::Error;

use crate::validate::PatternIssue;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur outside the fail-open redaction paths.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// A user-supplied pattern was rejected.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternIssue),

    /// No rule template has the requested name.
    #[error("unknown rule template: {0}")]
    TemplateNotFound(String),

    /// I/O error while reading rule or vault files.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Internal error that should never expose raw data.
    /// The message is sanitized to prevent secret leakage.
    #[error("internal error (details redacted for safety)")]
    InternalError,
}

impl RedactionError {
    /// Create an internal error, ensuring no sensitive data is exposed.
    pub fn internal() -> Self {
        RedactionError::InternalError
    }
}
