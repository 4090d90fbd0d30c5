//! Mapper contract and registry.
//!
//! A mapper is a pure function from a canonical document to graph elements.
//! New entity types are new registry entries, not new types: the registry is
//! an explicit table from collection name to mapper.

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::CanonicalDocument;
use crate::error::{ConfigError, MapperError};
use crate::graph::MapperResult;

/// Pure document → graph-elements function. No I/O, deterministic.
pub trait Mapper: Send + Sync {
    fn map(&self, doc: &CanonicalDocument) -> Result<MapperResult, MapperError>;
}

impl<F> Mapper for F
where
    F: Fn(&CanonicalDocument) -> Result<MapperResult, MapperError> + Send + Sync,
{
    fn map(&self, doc: &CanonicalDocument) -> Result<MapperResult, MapperError> {
        self(doc)
    }
}

/// Explicit collection → mapper table.
#[derive(Clone, Default)]
pub struct MapperRegistry {
    mappers: HashMap<String, Arc<dyn Mapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collection: impl Into<String>, mapper: Arc<dyn Mapper>) {
        self.mappers.insert(collection.into(), mapper);
    }

    pub fn get(&self, collection: &str) -> Option<Arc<dyn Mapper>> {
        self.mappers.get(collection).cloned()
    }

    /// Fail-fast lookup used during config validation, before any I/O.
    pub fn require(&self, collection: &str) -> Result<Arc<dyn Mapper>, ConfigError> {
        self.get(collection)
            .ok_or_else(|| ConfigError::UnknownCollection(collection.to_string()))
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.mappers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_unknown_collection() {
        let registry = MapperRegistry::new();
        assert!(matches!(
            registry.require("contracts_gold"),
            Err(ConfigError::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_closure_mapper() {
        let mut registry = MapperRegistry::new();
        registry.register(
            "contracts_gold",
            Arc::new(|_doc: &CanonicalDocument| Ok(MapperResult::default())),
        );
        assert!(registry.require("contracts_gold").is_ok());
    }
}
