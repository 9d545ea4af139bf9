//! Entity catalog
//!
//! The catalog owns the defined-type registry and every entity schema built
//! from it. It is assembled once at startup:
//! - Schemas are registered by name and never replaced
//! - Any construction failure aborts startup (FATAL)
//! - After `builtin` returns, the catalog is read-only

pub mod targets;
pub mod upstreams;

use std::collections::BTreeMap;

use crate::observability::{log_event, Event};
use crate::schema::{EntitySchema, SchemaError, SchemaResult, TypeRegistry};

/// Registry of entity schemas indexed by entity name
#[derive(Debug, Clone)]
pub struct Catalog {
    types: TypeRegistry,
    schemas: BTreeMap<String, EntitySchema>,
}

impl Catalog {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            schemas: BTreeMap::new(),
        }
    }

    /// Builds the catalog of balancer entities on top of the built-in types.
    ///
    /// # Errors
    ///
    /// Returns the first `SchemaError` raised while declaring a schema. The
    /// failure is logged at FATAL before it is returned.
    pub fn builtin() -> SchemaResult<Self> {
        Self::assemble().map_err(|e| {
            log_event(
                Event::SchemaConstructionFailed,
                &[("code", e.code()), ("reason", e.to_string().as_str())],
            );
            e
        })
    }

    fn assemble() -> SchemaResult<Self> {
        let mut catalog = Self::new(TypeRegistry::builtin()?);
        let upstreams = upstreams::schema(catalog.types())?;
        catalog.register(upstreams)?;
        let targets = targets::schema(catalog.types())?;
        catalog.register(targets)?;

        let count = catalog.len().to_string();
        log_event(Event::CatalogReady, &[("schemas", count.as_str())]);
        Ok(catalog)
    }

    /// Registers a built schema.
    ///
    /// # Errors
    ///
    /// `DuplicateSchema` if a schema with the same name is already present.
    /// Registered schemas are immutable.
    pub fn register(&mut self, schema: EntitySchema) -> SchemaResult<()> {
        if self.schemas.contains_key(schema.name()) {
            return Err(SchemaError::DuplicateSchema(schema.name().to_string()));
        }

        let fields = schema.fields().len().to_string();
        let checks = schema.checks().len().to_string();
        log_event(
            Event::SchemaBuilt,
            &[
                ("entity", schema.name()),
                ("fields", fields.as_str()),
                ("checks", checks.as_str()),
            ],
        );

        self.schemas.insert(schema.name().to_string(), schema);
        Ok(())
    }

    /// Looks up a schema by entity name.
    pub fn get(&self, name: &str) -> SchemaResult<&EntitySchema> {
        self.schemas
            .get(name)
            .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.values()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
