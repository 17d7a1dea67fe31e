//! Execution error types
//!
//! Error codes:
//! - EXECUTION_TIMEOUT (statement or pool acquire timed out)
//! - EXECUTION_FAILURE (any other backend failure)
//!
//! The caller-facing message is fixed per code. Backend detail is kept in
//! `detail` for the log and never leaves the process.

use std::fmt;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::pagination::PaginationError;

/// Execution error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorCode {
    Timeout,
    Failure,
}

impl ExecutionErrorCode {
    /// Returns the wire code string
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionErrorCode::Timeout => "EXECUTION_TIMEOUT",
            ExecutionErrorCode::Failure => "EXECUTION_FAILURE",
        }
    }

    /// Generic caller-facing message
    pub fn public_message(&self) -> &'static str {
        match self {
            ExecutionErrorCode::Timeout => "Query did not complete within the time limit",
            ExecutionErrorCode::Failure => "Query execution failed",
        }
    }
}

impl fmt::Display for ExecutionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Backend failure with the detail kept for logging
#[derive(Debug)]
pub struct ExecutionError {
    code: ExecutionErrorCode,
    detail: String,
}

impl ExecutionError {
    /// Create a timeout error
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            code: ExecutionErrorCode::Timeout,
            detail: detail.into(),
        }
    }

    /// Create a failure error
    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            code: ExecutionErrorCode::Failure,
            detail: detail.into(),
        }
    }

    /// Classifies a driver error.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::timeout("connection pool acquire timed out"),
            other => Self::failure(other.to_string()),
        }
    }

    pub fn code(&self) -> ExecutionErrorCode {
        self.code
    }

    /// Caller-facing message; never contains backend text
    pub fn message(&self) -> &'static str {
        self.code.public_message()
    }

    /// Backend detail for the log
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message())
    }
}

impl std::error::Error for ExecutionError {}

/// Result type for execution
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Failure producing one page window
#[derive(Debug, Error)]
pub enum PageError {
    /// The cursor does not fit the compiled query
    #[error("{0}")]
    Cursor(#[from] PaginationError),

    #[error("{0}")]
    Execution(#[from] ExecutionError),
}

impl PageError {
    /// Backend detail for the log
    pub fn detail(&self) -> Option<&str> {
        match self {
            PageError::Cursor(_) => None,
            PageError::Execution(e) => Some(e.detail()),
        }
    }
}

/// Conditions that stop the engine from starting. All are fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Catalog(#[from] CatalogError),

    #[error("[FATAL] DATABASE_UNAVAILABLE: {0}")]
    Database(#[from] sqlx::Error),
}

impl StartupError {
    pub fn code(&self) -> &'static str {
        match self {
            StartupError::Config(e) => e.code(),
            StartupError::Catalog(e) => e.code().code(),
            StartupError::Database(_) => "DATABASE_UNAVAILABLE",
        }
    }
}
