//! The user-visible error taxonomy shared across the service.
//!
//! Every component that can fail maps its failures onto one of these
//! kinds rather than leaking an implementation-specific error type past
//! its own boundary. The HTTP layer decides status codes per endpoint;
//! this enum only carries the *kind* and a human-readable detail.

use std::fmt;

/// A user-visible error kind, matching the error handling design's taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request envelope (e.g. both `message` and `intent` present).
    ProtocolViolation,
    /// `datasetId` does not refer to a registered dataset.
    DatasetNotFound,
    /// Source file missing, unsupported format, or over the ingest size bound.
    FileUnreadable,
    /// The SQL validator rejected a query.
    ValidationFailed,
    /// AI Assist is on but no provider key is configured.
    AiUnavailable,
    /// The intent extractor's response could not be parsed as the expected record.
    AiInvalidResponse,
    /// A query exceeded its execution timeout.
    QueryTimeout,
    /// Any other engine-level failure.
    EngineError,
}

impl ErrorKind {
    /// Stable machine-readable name, used as a field in API error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProtocolViolation => "protocol_violation",
            ErrorKind::DatasetNotFound => "dataset_not_found",
            ErrorKind::FileUnreadable => "file_unreadable",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::AiUnavailable => "ai_unavailable",
            ErrorKind::AiInvalidResponse => "ai_invalid_response",
            ErrorKind::QueryTimeout => "query_timeout",
            ErrorKind::EngineError => "engine_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shared error type for core operations.
///
/// Crates with their own richer error enums (the validator's rejection
/// reasons, the executor's failure kinds) convert into this at their
/// boundary via `From` so callers above them deal with one vocabulary.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolViolation, message)
    }

    pub fn dataset_not_found(dataset_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::DatasetNotFound,
            format!("dataset '{dataset_id}' is not registered"),
        )
    }

    pub fn file_unreadable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileUnreadable, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed, message)
    }

    pub fn engine_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EngineError, message)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
