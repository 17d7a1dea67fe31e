//! Closed error taxonomy seen by callers

use std::fmt;

use serde::{Serialize, Serializer};

use crate::engine::{ExecutionError, ExecutionErrorCode, PageError};
use crate::pagination::PaginationError;
use crate::plan::{PlanError, PlanErrorCode};

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller fixes the plan
    Validation,
    /// Caller re-issues the plan
    Pagination,
    /// Caller may retry with backoff
    Backend,
}

/// Every error code a result can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnknownEntity,
    UnknownField,
    UnsupportedOperation,
    InvalidFilter,
    TimeRangeRequired,
    LimitExceeded,
    InvalidToken,
    ExpiredToken,
    StaleQuery,
    ExecutionTimeout,
    ExecutionFailure,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 11] = [
        ErrorCode::UnknownEntity,
        ErrorCode::UnknownField,
        ErrorCode::UnsupportedOperation,
        ErrorCode::InvalidFilter,
        ErrorCode::TimeRangeRequired,
        ErrorCode::LimitExceeded,
        ErrorCode::InvalidToken,
        ErrorCode::ExpiredToken,
        ErrorCode::StaleQuery,
        ErrorCode::ExecutionTimeout,
        ErrorCode::ExecutionFailure,
    ];

    /// Returns the wire code string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnknownEntity => "UNKNOWN_ENTITY",
            ErrorCode::UnknownField => "UNKNOWN_FIELD",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ErrorCode::InvalidFilter => "INVALID_FILTER",
            ErrorCode::TimeRangeRequired => "TIME_RANGE_REQUIRED",
            ErrorCode::LimitExceeded => "LIMIT_EXCEEDED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::ExpiredToken => "EXPIRED_TOKEN",
            ErrorCode::StaleQuery => "STALE_QUERY",
            ErrorCode::ExecutionTimeout => "EXECUTION_TIMEOUT",
            ErrorCode::ExecutionFailure => "EXECUTION_FAILURE",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::UnknownEntity
            | ErrorCode::UnknownField
            | ErrorCode::UnsupportedOperation
            | ErrorCode::InvalidFilter
            | ErrorCode::TimeRangeRequired
            | ErrorCode::LimitExceeded => ErrorCategory::Validation,
            ErrorCode::InvalidToken | ErrorCode::ExpiredToken | ErrorCode::StaleQuery => {
                ErrorCategory::Pagination
            }
            ErrorCode::ExecutionTimeout | ErrorCode::ExecutionFailure => ErrorCategory::Backend,
        }
    }

    /// Whether the same request may succeed when retried unchanged
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Backend
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ExpiredToken | ErrorCode::StaleQuery => 410,
            ErrorCode::ExecutionTimeout => 504,
            ErrorCode::ExecutionFailure => 502,
            _ => 400,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<PlanErrorCode> for ErrorCode {
    fn from(code: PlanErrorCode) -> Self {
        match code {
            PlanErrorCode::UnknownEntity => ErrorCode::UnknownEntity,
            PlanErrorCode::UnknownField => ErrorCode::UnknownField,
            PlanErrorCode::UnsupportedOperation => ErrorCode::UnsupportedOperation,
            PlanErrorCode::InvalidFilter => ErrorCode::InvalidFilter,
            PlanErrorCode::TimeRangeRequired => ErrorCode::TimeRangeRequired,
            PlanErrorCode::LimitExceeded => ErrorCode::LimitExceeded,
        }
    }
}

impl From<ExecutionErrorCode> for ErrorCode {
    fn from(code: ExecutionErrorCode) -> Self {
        match code {
            ExecutionErrorCode::Timeout => ErrorCode::ExecutionTimeout,
            ExecutionErrorCode::Failure => ErrorCode::ExecutionFailure,
        }
    }
}

/// An error reduced to its code and caller-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl QueryFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for QueryFailure {}

impl From<PlanError> for QueryFailure {
    fn from(err: PlanError) -> Self {
        Self::new(err.code().into(), err.message())
    }
}

impl From<PaginationError> for QueryFailure {
    fn from(err: PaginationError) -> Self {
        let code = match err {
            PaginationError::InvalidToken => ErrorCode::InvalidToken,
            PaginationError::ExpiredToken => ErrorCode::ExpiredToken,
            PaginationError::StaleQuery => ErrorCode::StaleQuery,
            PaginationError::TokenGenerationFailed => ErrorCode::ExecutionFailure,
        };
        Self::new(code, err.to_string())
    }
}

impl From<ExecutionError> for QueryFailure {
    fn from(err: ExecutionError) -> Self {
        Self::new(err.code().into(), err.message())
    }
}

impl From<PageError> for QueryFailure {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Cursor(e) => e.into(),
            PageError::Execution(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_distinct() {
        let strings: HashSet<&str> = ErrorCode::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(strings.len(), ErrorCode::ALL.len());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorCode::InvalidFilter.http_status(), 400);
        assert_eq!(ErrorCode::InvalidToken.http_status(), 400);
        assert_eq!(ErrorCode::ExpiredToken.http_status(), 410);
        assert_eq!(ErrorCode::StaleQuery.http_status(), 410);
        assert_eq!(ErrorCode::ExecutionTimeout.http_status(), 504);
        assert_eq!(ErrorCode::ExecutionFailure.http_status(), 502);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ErrorCode::LimitExceeded.category(), ErrorCategory::Validation);
        assert_eq!(ErrorCode::StaleQuery.category(), ErrorCategory::Pagination);
        assert!(ErrorCode::ExecutionTimeout.is_recoverable());
        assert!(!ErrorCode::UnknownField.is_recoverable());
    }

    #[test]
    fn test_execution_failure_message_is_generic() {
        let failure: QueryFailure = ExecutionError::failure("no such table: refunds").into();
        assert_eq!(failure.code, ErrorCode::ExecutionFailure);
        assert!(!failure.message.contains("refunds"));
    }

    #[test]
    fn test_plan_error_conversion() {
        let failure: QueryFailure = PlanError::limit_exceeded(5000, 1000).into();
        assert_eq!(failure.code, ErrorCode::LimitExceeded);
        assert!(failure.message.contains("5000"));
    }

    #[test]
    fn test_serializes_as_wire_code() {
        assert_eq!(
            serde_json::to_value(ErrorCode::TimeRangeRequired).unwrap(),
            serde_json::json!("TIME_RANGE_REQUIRED")
        );
    }
}
