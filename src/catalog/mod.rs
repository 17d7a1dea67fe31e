//! Entity catalog subsystem
//!
//! Binds logical entity and field names to physical tables and columns.
//!
//! # Design Principles
//!
//! - Every column mapping is explicit; nothing is derived from names
//! - Loaded once at startup, read-only afterwards
//! - Load failure is fatal
//! - Unknown names are first-class errors, never driver errors

#[allow(clippy::module_inception)]
mod catalog;
mod errors;
mod loader;
mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use catalog::Catalog;
pub use errors::{CatalogError, CatalogErrorCode, CatalogResult};
pub use loader::CatalogLoader;
pub use types::{
    is_sql_identifier, CatalogDef, EntityDef, EntityDescriptor, EntityId, FieldDef,
    FieldDescriptor, FieldId, FilterOperator, Requirement, ValueKind,
};
