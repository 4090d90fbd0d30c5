//! In-memory graph store for tests.
//!
//! Mirrors the Neo4j merge semantics 1:1 — `(label, id)` node identity,
//! property-extending re-merge, stub endpoints for dangling references —
//! and adds fault injection (failing the next N batches) and scripted
//! enrichment rule outcomes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::enrich::EnrichmentRule;
use crate::error::GraphError;
use crate::store::{GraphStore, MergeBatch, WriteSummary};

type NodeId = (String, String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EdgeKey {
    rel_type: String,
    from: NodeId,
    to: NodeId,
    /// Canonicalized identity property values, in declaration order.
    identity: Vec<(String, String)>,
}

#[derive(Default)]
struct GraphState {
    nodes: HashMap<NodeId, Map<String, Value>>,
    stubs: HashSet<NodeId>,
    edges: HashMap<EdgeKey, Map<String, Value>>,
}

#[derive(Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
    fail_batches: AtomicUsize,
    rule_results: Mutex<HashMap<String, VecDeque<Result<u64, String>>>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` `apply_batch` calls fail before writing anything.
    pub fn fail_next_batches(&self, n: usize) {
        self.fail_batches.store(n, Ordering::SeqCst);
    }

    /// Queue an outcome for the named rule. Unscripted rules return Ok(0).
    pub fn script_rule(&self, name: &str, result: Result<u64, String>) {
        self.rule_results
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().unwrap().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().unwrap().edges.len()
    }

    pub fn stub_count(&self) -> usize {
        self.state.lock().unwrap().stubs.len()
    }

    pub fn node(&self, label: &str, key: &str) -> Option<Map<String, Value>> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .get(&(label.to_string(), key.to_string()))
            .cloned()
    }

    pub fn is_stub(&self, label: &str, key: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .stubs
            .contains(&(label.to_string(), key.to_string()))
    }

    pub fn has_edge(&self, rel_type: &str, from: (&str, &str), to: (&str, &str)) -> bool {
        let state = self.state.lock().unwrap();
        state.edges.keys().any(|k| {
            k.rel_type == rel_type
                && k.from == (from.0.to_string(), from.1.to_string())
                && k.to == (to.0.to_string(), to.1.to_string())
        })
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn apply_batch(&self, batch: &MergeBatch) -> Result<WriteSummary, GraphError> {
        // Injected failures happen before any write, matching a transaction
        // rollback: the batch either fully applies or leaves no trace.
        let pending = self.fail_batches.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_batches.store(pending - 1, Ordering::SeqCst);
            return Err(GraphError::Injected("batch write refused".to_string()));
        }

        let mut state = self.state.lock().unwrap();

        for group in &batch.node_groups {
            for row in &group.rows {
                let id = (group.label.clone(), row.key.clone());
                state
                    .nodes
                    .entry(id.clone())
                    .or_default()
                    .extend(row.properties.clone());
                state.stubs.remove(&id);
            }
        }

        for group in &batch.rel_groups {
            for row in &group.rows {
                let from = (group.from_label.clone(), row.from_key.clone());
                let to = (group.to_label.clone(), row.to_key.clone());
                for endpoint in [&from, &to] {
                    if !state.nodes.contains_key(endpoint) {
                        state.nodes.insert(endpoint.clone(), Map::new());
                        state.stubs.insert(endpoint.clone());
                    }
                }
                let key = EdgeKey {
                    rel_type: group.rel_type.clone(),
                    from,
                    to,
                    identity: group
                        .identity_props
                        .iter()
                        .map(|name| {
                            let value = row
                                .properties
                                .get(name)
                                .cloned()
                                .unwrap_or(Value::Null)
                                .to_string();
                            (name.clone(), value)
                        })
                        .collect(),
                };
                state
                    .edges
                    .entry(key)
                    .or_default()
                    .extend(row.properties.clone());
            }
        }

        Ok(WriteSummary {
            nodes_merged: batch.node_count(),
            relationships_merged: batch.relationship_count(),
        })
    }

    async fn run_rule(&self, rule: &EnrichmentRule) -> Result<u64, GraphError> {
        let scripted = self
            .rule_results
            .lock()
            .unwrap()
            .get_mut(rule.name)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Ok(created)) => Ok(created),
            Some(Err(message)) => Err(GraphError::Injected(message)),
            None => Ok(0),
        }
    }

    async fn count_stub_nodes(&self) -> Result<u64, GraphError> {
        Ok(self.stub_count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NodeGroup, NodeRow, RelGroup, RelRow};

    fn node_batch(label: &str, key: &str, props: &[(&str, &str)]) -> MergeBatch {
        let mut properties = Map::new();
        for (k, v) in props {
            properties.insert((*k).to_string(), Value::String((*v).to_string()));
        }
        MergeBatch {
            node_groups: vec![NodeGroup {
                label: label.to_string(),
                rows: vec![NodeRow {
                    key: key.to_string(),
                    properties,
                }],
            }],
            rel_groups: vec![],
        }
    }

    #[tokio::test]
    async fn test_node_merge_is_idempotent() {
        let graph = MemoryGraph::new();
        graph
            .apply_batch(&node_batch("Entity", "500", &[("entity_name", "ACME")]))
            .await
            .unwrap();
        graph
            .apply_batch(&node_batch("Entity", "500", &[("district", "Porto")]))
            .await
            .unwrap();

        assert_eq!(graph.node_count(), 1);
        let node = graph.node("Entity", "500").unwrap();
        assert_eq!(node.len(), 2);
    }

    #[tokio::test]
    async fn test_dangling_reference_creates_stub() {
        let graph = MemoryGraph::new();
        let batch = MergeBatch {
            node_groups: vec![],
            rel_groups: vec![RelGroup {
                rel_type: "SIGNED_CONTRACT".into(),
                from_label: "Entity".into(),
                to_label: "Contract".into(),
                identity_props: vec![],
                rows: vec![RelRow {
                    from_key: "500".into(),
                    to_key: "C1".into(),
                    properties: Map::new(),
                }],
            }],
        };
        graph.apply_batch(&batch).await.unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.stub_count(), 2);
        assert!(graph.has_edge("SIGNED_CONTRACT", ("Entity", "500"), ("Contract", "C1")));

        // Merging the real node reconciles the stub in place.
        graph
            .apply_batch(&node_batch("Entity", "500", &[("entity_name", "ACME")]))
            .await
            .unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.stub_count(), 1);
        assert!(!graph.is_stub("Entity", "500"));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let graph = MemoryGraph::new();
        graph.fail_next_batches(1);
        let err = graph
            .apply_batch(&node_batch("Entity", "500", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Injected(_)));
        assert_eq!(graph.node_count(), 0);

        graph
            .apply_batch(&node_batch("Entity", "500", &[]))
            .await
            .unwrap();
        assert_eq!(graph.node_count(), 1);
    }
}
