//! Pagination errors
//!
//! All token failures are recoverable by re-issuing the original plan.

use thiserror::Error;

/// Result type for pagination operations
pub type PaginationResult<T> = Result<T, PaginationError>;

/// Continuation token errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Malformed, bad signature, wrong issuer or audience, or already used
    #[error("Query token is invalid")]
    InvalidToken,

    /// Past its expiry
    #[error("Query token has expired")]
    ExpiredToken,

    /// The compiled query behind the token is no longer live
    #[error("Query is no longer available; re-issue the plan")]
    StaleQuery,

    /// Signing failed
    #[error("Query token could not be generated")]
    TokenGenerationFailed,
}

impl PaginationError {
    /// Returns the wire code string
    pub fn code(&self) -> &'static str {
        match self {
            PaginationError::InvalidToken => "INVALID_TOKEN",
            PaginationError::ExpiredToken => "EXPIRED_TOKEN",
            PaginationError::StaleQuery => "STALE_QUERY",
            PaginationError::TokenGenerationFailed => "EXECUTION_FAILURE",
        }
    }
}
