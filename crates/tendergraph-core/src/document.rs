//! Canonical documents handed to the sync engine by the document store.

use serde_json::{Map, Value};

/// A validated gold-layer record read from a document-store collection.
///
/// Store metadata (`_id`, `_rev`, any `_`-prefixed key) is stripped at the
/// store boundary; `fields` holds only the payload. Documents are immutable
/// once read.
#[derive(Debug, Clone)]
pub struct CanonicalDocument {
    pub id: String,
    pub collection: String,
    pub fields: Map<String, Value>,
}

impl CanonicalDocument {
    pub fn new(id: impl Into<String>, collection: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field, if present and a string.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    /// Array field, if present and an array. Missing and null both yield None.
    pub fn array_field(&self, field: &str) -> Option<&Vec<Value>> {
        self.fields.get(field).and_then(Value::as_array)
    }

    /// Non-null string elements of an array field, deduplicated in order.
    pub fn str_list(&self, field: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.array_field(field)
            .map(|items| {
                items
                    .iter()
                    .filter_map(json_to_id)
                    .filter(|s| seen.insert(s.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Coerce a JSON scalar into an identifier string (numbers allowed — several
/// registries export numeric VATs and contract ids).
pub fn json_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
