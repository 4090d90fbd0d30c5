//! Graph-store boundary and batch assembly.
//!
//! A [`MergeBatch`] is the unit of atomicity: all of its node merges, then
//! all of its relationship merges, commit as one transaction. Node rows are
//! deduplicated by `(label, key)` and relationship rows by their full
//! identity before anything reaches the store, so re-mapping overlapping
//! documents inside one batch cannot double-write.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use tendergraph_core::MapperResult;

use crate::enrich::EnrichmentRule;
use crate::error::GraphError;

/// One node row: identity key plus properties (key excluded).
#[derive(Debug, Clone)]
pub struct NodeRow {
    pub key: String,
    pub properties: Map<String, Value>,
}

/// Node rows sharing a label, merged with one statement shape.
#[derive(Debug, Clone)]
pub struct NodeGroup {
    pub label: String,
    pub rows: Vec<NodeRow>,
}

#[derive(Debug, Clone)]
pub struct RelRow {
    pub from_key: String,
    pub to_key: String,
    pub properties: Map<String, Value>,
}

/// Relationship rows sharing type, endpoint labels and identity properties.
#[derive(Debug, Clone)]
pub struct RelGroup {
    pub rel_type: String,
    pub from_label: String,
    pub to_label: String,
    /// Property names that are part of the relationship identity.
    pub identity_props: Vec<String>,
    pub rows: Vec<RelRow>,
}

/// A batch of merges applied as one atomic transaction, nodes first.
#[derive(Debug, Clone, Default)]
pub struct MergeBatch {
    pub node_groups: Vec<NodeGroup>,
    pub rel_groups: Vec<RelGroup>,
}

impl MergeBatch {
    /// Fold mapper results into deduplicated, grouped merge rows.
    /// Later properties win for rows with the same identity.
    pub fn from_results(results: &[MapperResult]) -> Self {
        let mut batch = MergeBatch::default();
        let mut node_index: HashMap<(String, String), (usize, usize)> = HashMap::new();
        let mut node_groups: HashMap<String, usize> = HashMap::new();
        let mut rel_index: HashMap<RelIdentity, (usize, usize)> = HashMap::new();
        let mut rel_groups: HashMap<RelGroupKey, usize> = HashMap::new();

        for result in results {
            for node in &result.nodes {
                let identity = (node.label.clone(), node.key.clone());
                match node_index.get(&identity) {
                    Some(&(g, r)) => {
                        batch.node_groups[g].rows[r]
                            .properties
                            .extend(node.properties.clone());
                    }
                    None => {
                        let g = *node_groups.entry(node.label.clone()).or_insert_with(|| {
                            batch.node_groups.push(NodeGroup {
                                label: node.label.clone(),
                                rows: Vec::new(),
                            });
                            batch.node_groups.len() - 1
                        });
                        batch.node_groups[g].rows.push(NodeRow {
                            key: node.key.clone(),
                            properties: node.properties.clone(),
                        });
                        node_index.insert(identity, (g, batch.node_groups[g].rows.len() - 1));
                    }
                }
            }

            for rel in &result.relationships {
                let group_key = RelGroupKey {
                    rel_type: rel.rel_type.clone(),
                    from_label: rel.from.label.clone(),
                    to_label: rel.to.label.clone(),
                    identity_props: rel.identity_props.clone(),
                };
                let identity = RelIdentity {
                    group: group_key.clone(),
                    from_key: rel.from.key.clone(),
                    to_key: rel.to.key.clone(),
                    identity_values: rel
                        .identity_props
                        .iter()
                        .map(|p| rel.properties.get(p).cloned().unwrap_or(Value::Null).to_string())
                        .collect(),
                };
                match rel_index.get(&identity) {
                    Some(&(g, r)) => {
                        batch.rel_groups[g].rows[r]
                            .properties
                            .extend(rel.properties.clone());
                    }
                    None => {
                        let g = *rel_groups.entry(group_key.clone()).or_insert_with(|| {
                            batch.rel_groups.push(RelGroup {
                                rel_type: group_key.rel_type.clone(),
                                from_label: group_key.from_label.clone(),
                                to_label: group_key.to_label.clone(),
                                identity_props: group_key.identity_props.clone(),
                                rows: Vec::new(),
                            });
                            batch.rel_groups.len() - 1
                        });
                        batch.rel_groups[g].rows.push(RelRow {
                            from_key: rel.from.key.clone(),
                            to_key: rel.to.key.clone(),
                            properties: rel.properties.clone(),
                        });
                        rel_index.insert(identity, (g, batch.rel_groups[g].rows.len() - 1));
                    }
                }
            }
        }

        batch
    }

    pub fn is_empty(&self) -> bool {
        self.node_groups.is_empty() && self.rel_groups.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.node_groups.iter().map(|g| g.rows.len()).sum()
    }

    pub fn relationship_count(&self) -> usize {
        self.rel_groups.iter().map(|g| g.rows.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RelGroupKey {
    rel_type: String,
    from_label: String,
    to_label: String,
    identity_props: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RelIdentity {
    group: RelGroupKey,
    from_key: String,
    to_key: String,
    identity_values: Vec<String>,
}

/// Per-batch write counts reported by the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteSummary {
    pub nodes_merged: usize,
    pub relationships_merged: usize,
}

/// Node and relationship totals, for status display.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphCounts {
    pub nodes: u64,
    pub relationships: u64,
}

/// Statement-execution boundary against the property graph.
///
/// `apply_batch` must be atomic: a failed batch leaves no partial state
/// behind (the caller retries or halts at the previous checkpoint).
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn apply_batch(&self, batch: &MergeBatch) -> Result<WriteSummary, GraphError>;

    /// Execute one enrichment rule, returning the number of derived
    /// relationships it touched.
    async fn run_rule(&self, rule: &EnrichmentRule) -> Result<u64, GraphError>;

    /// Placeholder nodes still carrying only identity fields — endpoints of
    /// relationships whose owning document never synced.
    async fn count_stub_nodes(&self) -> Result<u64, GraphError>;
}
