//! Idempotency errors.

use thiserror::Error;

use super::types::OperationType;

/// Errors raised by the idempotency gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdempotencyError {
    /// The key was already used with a different request body.
    #[error("Idempotency key '{key}' was already used for a different {operation} request")]
    Conflict {
        /// Operation the key belongs to.
        operation: OperationType,
        /// The key.
        key: String,
    },

    /// A request with this key is still being processed.
    #[error("A {operation} request with idempotency key '{key}' is still in progress")]
    InProgress {
        /// Operation the key belongs to.
        operation: OperationType,
        /// The key.
        key: String,
    },

    /// The supplied key is malformed.
    #[error("Invalid idempotency key: {reason}")]
    InvalidKey {
        /// What is wrong with it.
        reason: String,
    },

    /// The stored response could not be encoded or decoded.
    #[error("Stored idempotent response is unreadable: {0}")]
    Payload(String),
}

impl IdempotencyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => "IDEMPOTENCY_CONFLICT",
            Self::InProgress { .. } => "IDEMPOTENCY_IN_PROGRESS",
            Self::InvalidKey { .. } => "INVALID_IDEMPOTENCY_KEY",
            Self::Payload(_) => "IDEMPOTENCY_PAYLOAD",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Conflict { .. } => 422,
            Self::InProgress { .. } => 409,
            Self::InvalidKey { .. } => 400,
            Self::Payload(_) => 500,
        }
    }

    /// True when the caller may retry after a backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }
}
