//! Error types for access control and membership mutations
//!
//! The surrounding request handlers map these typed errors to HTTP
//! responses; nothing in this crate owns a wire format.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

/// Access control error taxonomy.
///
/// `RateLimited` and transient `Internal`/`Conflict` failures are retryable;
/// the rest are not without a change in caller state.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No actor identity could be resolved
    #[error("Not authenticated")]
    Unauthenticated,

    /// The actor lacks the role or capability for the requested action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Provider, membership, or team absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested state change violates a structural invariant
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Duplicate organization or concurrent-write collision
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Sliding window exhausted
    #[error("Rate limit exceeded, retry in {} seconds", retry_after.as_secs())]
    RateLimited {
        /// How long to wait before retrying
        retry_after: Duration,
        /// When the window frees a slot
        reset_at: DateTime<Utc>,
    },

    /// Unexpected store or asset failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for access control operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Whether the caller may retry without changing state first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AccessError::RateLimited { .. }
                | AccessError::Conflict(_)
                | AccessError::Internal(_)
        )
    }

    /// Check if this error should be logged at error level.
    ///
    /// Guard failures are expected outcomes and should not be logged as
    /// errors.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AccessError::Internal(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::Unauthenticated => 401,
            AccessError::Forbidden(_) => 403,
            AccessError::NotFound(_) => 404,
            AccessError::InvalidTransition(_) => 422,
            AccessError::Conflict(_) => 409,
            AccessError::RateLimited { .. } => 429,
            AccessError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated => "UNAUTHENTICATED",
            AccessError::Forbidden(_) => "FORBIDDEN",
            AccessError::NotFound(_) => "NOT_FOUND",
            AccessError::InvalidTransition(_) => "INVALID_TRANSITION",
            AccessError::Conflict(_) => "CONFLICT",
            AccessError::RateLimited { .. } => "RATE_LIMITED",
            AccessError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AccessError::NotFound(what),
            StoreError::Duplicate(what) => AccessError::Conflict(what),
            StoreError::GuardViolation(what) => AccessError::InvalidTransition(what),
            StoreError::Conflict(what) => AccessError::Conflict(what),
            StoreError::Backend(what) => AccessError::Internal(what),
        }
    }
}
