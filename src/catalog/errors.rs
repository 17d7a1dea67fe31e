//! Catalog error types
//!
//! Error codes:
//! - UNKNOWN_ENTITY (REJECT)
//! - UNKNOWN_FIELD (REJECT)
//! - CATALOG_LOAD_FAILED (FATAL)

use std::fmt;

/// Severity levels for catalog errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Process must not start serving
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Catalog-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorCode {
    /// Logical entity name not declared
    UnknownEntity,
    /// Logical field name not declared on the entity
    UnknownField,
    /// Catalog file missing, malformed, or structurally invalid
    LoadFailed,
}

impl CatalogErrorCode {
    /// Returns the wire code string
    pub fn code(&self) -> &'static str {
        match self {
            CatalogErrorCode::UnknownEntity => "UNKNOWN_ENTITY",
            CatalogErrorCode::UnknownField => "UNKNOWN_FIELD",
            CatalogErrorCode::LoadFailed => "CATALOG_LOAD_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            CatalogErrorCode::LoadFailed => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for CatalogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Catalog error with full context
#[derive(Debug, Clone)]
pub struct CatalogError {
    code: CatalogErrorCode,
    message: String,
    entity: Option<String>,
    field: Option<String>,
}

impl CatalogError {
    /// Create an unknown entity error
    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self {
            code: CatalogErrorCode::UnknownEntity,
            message: format!("Entity '{}' is not declared in the catalog", entity),
            entity: Some(entity),
            field: None,
        }
    }

    /// Create an unknown field error
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self {
            code: CatalogErrorCode::UnknownField,
            message: format!("Field '{}' is not declared on entity '{}'", field, entity),
            entity: Some(entity),
            field: Some(field),
        }
    }

    /// Create a load failure for a catalog source
    pub fn load_failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: CatalogErrorCode::LoadFailed,
            message: format!("Catalog '{}' rejected: {}", source.into(), reason.into()),
            entity: None,
            field: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> CatalogErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the entity name if applicable
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Returns the field name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns whether this error must stop startup
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for CatalogError {}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
