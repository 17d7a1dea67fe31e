//! Catalog loader
//!
//! The catalog is read once at startup from a single JSON file. A missing,
//! unreadable or structurally invalid file is fatal: the engine must not
//! start serving without a catalog.

use std::fs;
use std::path::{Path, PathBuf};

use super::catalog::Catalog;
use super::errors::{CatalogError, CatalogResult};
use super::types::CatalogDef;

/// Reads catalog definitions from disk.
pub struct CatalogLoader {
    path: PathBuf,
}

impl CatalogLoader {
    /// Creates a loader for the given catalog file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the catalog file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the definition without building descriptors.
    pub fn read_definition(&self) -> CatalogResult<CatalogDef> {
        let source = self.path.display().to_string();

        let content = fs::read_to_string(&self.path).map_err(|e| {
            CatalogError::load_failed(&source, format!("Failed to read file: {}", e))
        })?;

        let def: CatalogDef = serde_json::from_str(&content)
            .map_err(|e| CatalogError::load_failed(&source, format!("Invalid JSON: {}", e)))?;

        def.validate_structure()
            .map_err(|e| CatalogError::load_failed(&source, e))?;

        Ok(def)
    }

    /// Loads the catalog file and builds the arena at the given generation.
    pub fn load(&self, generation: u64) -> CatalogResult<Catalog> {
        let def = self.read_definition()?;
        Catalog::from_definition(&def, generation)
    }

    /// Writes a definition to the loader's path (used by tooling and tests).
    pub fn save_definition(&self, def: &CatalogDef) -> CatalogResult<()> {
        let source = self.path.display().to_string();
        let content = serde_json::to_string_pretty(def).map_err(|e| {
            CatalogError::load_failed(&source, format!("Failed to serialize catalog: {}", e))
        })?;
        fs::write(&self.path, content).map_err(|e| {
            CatalogError::load_failed(&source, format!("Failed to write file: {}", e))
        })
    }
}
