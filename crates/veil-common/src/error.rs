//! Error types for Veil.
//!
//! Every error carries:
//! - A stable numeric code for machine parsing
//! - A category for grouping
//! - A recoverability hint
//!
//! The substitution surfaces never return these for ordinary input. They
//! fail open and report the error text on the result object instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Veil operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Profile record errors (malformed or inconsistent).
    Profile,
    /// Storage collaborator failures.
    Storage,
    /// User-supplied pattern errors.
    Pattern,
    /// File I/O and serialization errors.
    Io,
    /// Unexpected internal faults.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Profile => write!(f, "profile"),
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Pattern => write!(f, "pattern"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Unified error type for Veil.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Profile errors (20-29)
    #[error("invalid profile {id}: {reason}")]
    InvalidProfile { id: String, reason: String },

    #[error("malformed profile record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    // Storage errors (30-39)
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    // Pattern errors (40-49)
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("input too large: {len} bytes exceeds limit of {limit}")]
    InputTooLarge { len: usize, limit: usize },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal (90-99)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable numeric error code.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidProfile { .. } => 20,
            Error::MalformedRecord { .. } => 21,
            Error::ProfileNotFound(_) => 22,
            Error::StorageUnavailable(_) => 30,
            Error::InvalidPattern(_) => 40,
            Error::InputTooLarge { .. } => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Internal(_) => 90,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::InvalidProfile { .. }
            | Error::MalformedRecord { .. }
            | Error::ProfileNotFound(_) => ErrorCategory::Profile,
            Error::StorageUnavailable(_) => ErrorCategory::Storage,
            Error::InvalidPattern(_) | Error::InputTooLarge { .. } => ErrorCategory::Pattern,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
            Error::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidProfile { .. } => true,
            Error::MalformedRecord { .. } => true,
            Error::ProfileNotFound(_) => false,
            // Storage may come back (decryption unavailable in this context)
            Error::StorageUnavailable(_) => true,
            Error::InvalidPattern(_) => true,
            Error::InputTooLarge { .. } => false,
            Error::Io(_) => true,
            Error::Json(_) => true,
            Error::Internal(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_grouped_by_category() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::ProfileNotFound("p".into()).code(), 22);
        assert_eq!(Error::StorageUnavailable("locked".into()).code(), 30);
        assert_eq!(Error::Internal("boom".into()).code(), 90);
    }

    #[test]
    fn test_category() {
        let err = Error::InputTooLarge { len: 10, limit: 5 };
        assert_eq!(err.category(), ErrorCategory::Pattern);
        assert!(!err.is_recoverable());

        let err = Error::MalformedRecord {
            index: 3,
            reason: "missing id".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Profile);
        assert_eq!(err.category().to_string(), "profile");
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::InvalidProfile {
            id: "p1".into(),
            reason: "real and alias name are identical".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("p1"));
        assert!(msg.contains("identical"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.code(), 60);
        assert_eq!(err.category(), ErrorCategory::Io);
    }
}
