//! Entity catalog arena
//!
//! Entities live in a `Vec` addressed by `EntityId`; names are interned once
//! at build time. The catalog never changes after construction. A reload
//! produces a new catalog with the next generation.

use std::collections::HashMap;

use super::errors::{CatalogError, CatalogResult};
use super::types::{CatalogDef, EntityDescriptor, EntityId, FieldDescriptor};

/// Read-only mapping from logical names to the physical schema
#[derive(Debug, Clone)]
pub struct Catalog {
    entities: Vec<EntityDescriptor>,
    index: HashMap<String, EntityId>,
    generation: u64,
}

impl Catalog {
    /// Builds a catalog from a definition, checking its structure first.
    pub fn from_definition(def: &CatalogDef, generation: u64) -> CatalogResult<Self> {
        def.validate_structure()
            .map_err(|e| CatalogError::load_failed("<in-memory>", e))?;

        let entities: Vec<EntityDescriptor> = def
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| EntityDescriptor::from_def(EntityId(i as u32), e))
            .collect();

        let index = entities
            .iter()
            .map(|e| (e.name.clone(), e.id))
            .collect::<HashMap<_, _>>();

        Ok(Self {
            entities,
            index,
            generation,
        })
    }

    /// Returns a copy of this catalog stamped with another generation.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Catalog generation; tokens minted under another generation are stale
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves a logical entity name.
    pub fn resolve_entity(&self, name: &str) -> CatalogResult<&EntityDescriptor> {
        self.index
            .get(name)
            .map(|id| self.entity(*id))
            .ok_or_else(|| CatalogError::unknown_entity(name))
    }

    /// Resolves a logical field name on an entity.
    pub fn resolve_field<'a>(
        &self,
        entity: &'a EntityDescriptor,
        name: &str,
    ) -> CatalogResult<&'a FieldDescriptor> {
        entity
            .field_named(name)
            .ok_or_else(|| CatalogError::unknown_field(&entity.name, name))
    }

    /// Entity by interned id
    pub fn entity(&self, id: EntityId) -> &EntityDescriptor {
        &self.entities[id.0 as usize]
    }

    /// All entities in declared order
    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter()
    }

    /// Number of declared entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
