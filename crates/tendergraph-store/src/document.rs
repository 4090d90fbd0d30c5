//! Document-store boundary.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use tendergraph_core::CanonicalDocument;

use crate::error::StoreError;

/// Read-only, id-ordered access to gold collections.
///
/// `after` is an exclusive cursor: the page starts strictly after that
/// document id. Ordering must be stable across calls so that a checkpoint
/// taken from one page resumes correctly on the next run.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch_page(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CanonicalDocument>, StoreError>;
}

/// In-memory document store for tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Map<String, Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, id: &str, fields: Value) {
        let map = fields
            .as_object()
            .cloned()
            .unwrap_or_default();
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), map);
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_page(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CanonicalDocument>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get(collection) else {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        };
        let lower = match after {
            Some(id) => Bound::Excluded(id.to_string()),
            None => Bound::Unbounded,
        };
        Ok(docs
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(id, fields)| CanonicalDocument::new(id.clone(), collection, fields.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_paging_is_id_ordered_and_exclusive() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b", "d"] {
            store.insert("contracts_gold", id, json!({"x": 1}));
        }

        let page = store.fetch_page("contracts_gold", None, 2).await.unwrap();
        assert_eq!(page.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);

        let page = store.fetch_page("contracts_gold", Some("b"), 10).await.unwrap();
        assert_eq!(page.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), ["c", "d"]);

        let page = store.fetch_page("contracts_gold", Some("d"), 10).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = MemoryStore::new();
        let err = store.fetch_page("nope", None, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound(_)));
    }
}
