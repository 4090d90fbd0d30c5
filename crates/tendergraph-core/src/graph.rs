//! Graph element specs — the output contract of a mapper.
//!
//! Identity conventions: every node is keyed by the `id` property within its
//! label; a relationship is keyed by `(type, from, to)` plus the values of
//! any declared identity properties.

use serde_json::{Map, Value};

/// The node key property name, uniform across all labels.
pub const KEY_PROPERTY: &str = "id";

/// A node to merge: identity is `(label, key)`. Re-merging the same identity
/// updates properties, it never creates a second node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub label: String,
    pub key: String,
    pub properties: Map<String, Value>,
}

impl NodeSpec {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            properties: Map::new(),
        }
    }

    /// Set a property, dropping JSON nulls (absent and null are the same
    /// thing in the graph).
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.properties.insert(name.into(), value);
        }
        self
    }

    pub fn reference(&self) -> NodeRef {
        NodeRef {
            label: self.label.clone(),
            key: self.key.clone(),
        }
    }
}

/// Reference to a node by identity. The referenced node need not exist yet:
/// the merge layer creates a placeholder carrying only the identity when a
/// relationship points at a node from a not-yet-synced collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub label: String,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
        }
    }
}

/// A relationship to merge between two node references.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSpec {
    pub rel_type: String,
    pub from: NodeRef,
    pub to: NodeRef,
    pub properties: Map<String, Value>,
    /// Property names that take part in the relationship identity, for
    /// types that accumulate multiplicity (e.g. one edge per contract id).
    /// Empty for ordinary types: `(type, from, to)` is the whole identity.
    pub identity_props: Vec<String>,
}

impl RelationshipSpec {
    pub fn new(rel_type: impl Into<String>, from: NodeRef, to: NodeRef) -> Self {
        Self {
            rel_type: rel_type.into(),
            from,
            to,
            properties: Map::new(),
            identity_props: Vec::new(),
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.properties.insert(name.into(), value);
        }
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Declare a property as part of the relationship identity.
    pub fn identity_prop(mut self, name: impl Into<String>) -> Self {
        self.identity_props.push(name.into());
        self
    }
}

/// Sole output contract of a mapper. Order matters only for same-batch
/// dependency: nodes are merged before any relationship referencing them.
#[derive(Debug, Clone, Default)]
pub struct MapperResult {
    pub nodes: Vec<NodeSpec>,
    pub relationships: Vec<RelationshipSpec>,
}

impl MapperResult {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}
