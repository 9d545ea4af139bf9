//! Existence resolution for foreign-reference fields
//!
//! The engine checks reference *shape* on its own. Existence belongs to
//! whoever stores the entities; they plug in through `ExistenceResolver`.

use std::collections::{BTreeMap, BTreeSet};

/// Answers whether an entity with the given primary key exists.
///
/// Implementations must be safe to call from concurrent validations.
pub trait ExistenceResolver: Send + Sync {
    fn exists(&self, entity: &str, id: &str) -> bool;
}

impl<F> ExistenceResolver for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn exists(&self, entity: &str, id: &str) -> bool {
        self(entity, id)
    }
}

/// Fixed set of known ids per entity, e.g. loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct KnownReferences {
    ids: BTreeMap<String, BTreeSet<String>>,
}

impl KnownReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: impl Into<String>, id: impl Into<String>) {
        self.ids
            .entry(entity.into())
            .or_default()
            .insert(id.into().to_ascii_lowercase());
    }

    pub fn len(&self) -> usize {
        self.ids.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExistenceResolver for KnownReferences {
    fn exists(&self, entity: &str, id: &str) -> bool {
        self.ids
            .get(entity)
            .map_or(false, |ids| ids.contains(&id.to_ascii_lowercase()))
    }
}
