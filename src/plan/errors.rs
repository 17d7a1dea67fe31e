//! Plan validation error types
//!
//! Error codes (all REJECT, recoverable by correcting the plan):
//! - UNKNOWN_ENTITY
//! - UNKNOWN_FIELD
//! - UNSUPPORTED_OPERATION
//! - INVALID_FILTER
//! - TIME_RANGE_REQUIRED
//! - LIMIT_EXCEEDED

use std::fmt;

use crate::catalog::{CatalogError, CatalogErrorCode};

/// Validation-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanErrorCode {
    /// Entity not declared in the catalog
    UnknownEntity,
    /// Field not declared on the entity
    UnknownField,
    /// Operation or aggregation function outside the vocabulary
    UnsupportedOperation,
    /// Operator, value, direction or alias rejected
    InvalidFilter,
    /// Entity requires a complete, ordered time range
    TimeRangeRequired,
    /// Limit not positive or above the configured maximum
    LimitExceeded,
}

impl PlanErrorCode {
    /// Returns the wire code string
    pub fn code(&self) -> &'static str {
        match self {
            PlanErrorCode::UnknownEntity => "UNKNOWN_ENTITY",
            PlanErrorCode::UnknownField => "UNKNOWN_FIELD",
            PlanErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            PlanErrorCode::InvalidFilter => "INVALID_FILTER",
            PlanErrorCode::TimeRangeRequired => "TIME_RANGE_REQUIRED",
            PlanErrorCode::LimitExceeded => "LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for PlanErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Plan validation error with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanError {
    code: PlanErrorCode,
    message: String,
    field: Option<String>,
}

impl PlanError {
    fn new(code: PlanErrorCode, message: impl Into<String>, field: Option<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field,
        }
    }

    /// Create an unknown entity error
    pub fn unknown_entity(entity: &str) -> Self {
        Self::new(
            PlanErrorCode::UnknownEntity,
            format!("Entity '{}' is not declared in the catalog", entity),
            None,
        )
    }

    /// Create an unknown field error
    pub fn unknown_field(entity: &str, field: &str) -> Self {
        Self::new(
            PlanErrorCode::UnknownField,
            format!("Field '{}' is not declared on entity '{}'", field, entity),
            Some(field.to_string()),
        )
    }

    /// Create an unsupported operation error
    pub fn unsupported_operation(reason: impl Into<String>) -> Self {
        Self::new(PlanErrorCode::UnsupportedOperation, reason, None)
    }

    /// Create an invalid filter error for a field
    pub fn invalid_filter(field: &str, reason: impl Into<String>) -> Self {
        Self::new(
            PlanErrorCode::InvalidFilter,
            format!("Field '{}': {}", field, reason.into()),
            Some(field.to_string()),
        )
    }

    /// Create a time range required error
    pub fn time_range_required(entity: &str, reason: impl Into<String>) -> Self {
        Self::new(
            PlanErrorCode::TimeRangeRequired,
            format!("Entity '{}' requires a time range: {}", entity, reason.into()),
            None,
        )
    }

    /// Create a limit exceeded error
    pub fn limit_exceeded(limit: i64, max: u32) -> Self {
        Self::new(
            PlanErrorCode::LimitExceeded,
            format!("Limit {} must be between 1 and {}", limit, max),
            None,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> PlanErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending field if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl From<CatalogError> for PlanError {
    fn from(err: CatalogError) -> Self {
        let code = match err.code() {
            CatalogErrorCode::UnknownEntity => PlanErrorCode::UnknownEntity,
            CatalogErrorCode::UnknownField => PlanErrorCode::UnknownField,
            // A loaded catalog never reports load failures during lookups
            CatalogErrorCode::LoadFailed => PlanErrorCode::UnsupportedOperation,
        };
        Self::new(code, err.message(), err.field().map(str::to_string))
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for PlanError {}

/// Result type for plan validation
pub type PlanResult<T> = Result<T, PlanError>;
