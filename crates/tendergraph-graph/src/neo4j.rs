//! Neo4j-backed graph store.
//!
//! Merge statements follow the engine's identity rules: nodes are merged by
//! `(label, id)` with `SET +=` semantics, relationship endpoints are merged
//! (not matched) so that references to not-yet-synced nodes materialize as
//! `_stub` placeholders, and each batch runs inside one transaction.

use neo4rs::{ConfigBuilder, Graph, Query};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use tendergraph_core::graph::KEY_PROPERTY;

use crate::enrich::EnrichmentRule;
use crate::error::GraphError;
use crate::store::{GraphCounts, GraphStore, MergeBatch, NodeRow, RelGroup, RelRow, WriteSummary};

use async_trait::async_trait;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_db")]
    pub db: String,
}

fn default_db() -> String {
    "neo4j".to_string()
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            db: default_db(),
        }
    }
}

/// Graph store over a neo4rs connection pool.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect and ping.
    ///
    /// neo4rs uses a lazy pool — `Graph::connect` does not open a bolt
    /// connection yet. The `RETURN 1` ping forces the handshake so callers
    /// get a fast failure when Neo4j is unreachable.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, GraphError> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.db.as_str())
            .max_connections(8)
            .fetch_size(500)
            .build()?;

        let graph = Graph::connect(neo4j_config).await?;
        graph.run(Query::new("RETURN 1".to_string())).await?;
        Ok(Self { graph })
    }

    /// Execute a Cypher statement that returns no results.
    pub async fn execute(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a Cypher statement and collect all rows.
    pub async fn query(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut result = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Ok(Some(row)) = result.next().await {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a Cypher statement and return one scalar field.
    pub async fn query_scalar<T: DeserializeOwned>(
        &self,
        query: Query,
        field: &str,
    ) -> Result<Option<T>, GraphError> {
        let rows = self.query(query).await?;
        match rows.into_iter().next() {
            Some(row) => {
                let value: T = row
                    .get(field)
                    .map_err(|e| GraphError::FieldDecode(field.to_string(), format!("{e:?}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Node and relationship totals, for the status command.
    pub async fn counts(&self) -> Result<GraphCounts, GraphError> {
        let nodes: i64 = self
            .query_scalar(
                Query::new("MATCH (n) RETURN count(n) AS count".to_string()),
                "count",
            )
            .await?
            .unwrap_or(0);
        let relationships: i64 = self
            .query_scalar(
                Query::new("MATCH ()-[r]->() RETURN count(r) AS count".to_string()),
                "count",
            )
            .await?
            .unwrap_or(0);
        Ok(GraphCounts {
            nodes: nodes as u64,
            relationships: relationships as u64,
        })
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn apply_batch(&self, batch: &MergeBatch) -> Result<WriteSummary, GraphError> {
        if batch.is_empty() {
            return Ok(WriteSummary::default());
        }

        // Nodes first, relationships second: same-batch references always
        // resolve, cross-batch references fall back to stub endpoints.
        let mut queries = Vec::with_capacity(batch.node_count() + batch.relationship_count());
        for group in &batch.node_groups {
            for row in &group.rows {
                queries.push(node_merge_query(&group.label, row));
            }
        }
        for group in &batch.rel_groups {
            for row in &group.rows {
                queries.push(rel_merge_query(group, row));
            }
        }

        debug!(statements = queries.len(), "Applying merge batch");
        let mut txn = self.graph.start_txn().await?;
        txn.run_queries(queries).await?;
        txn.commit().await?;

        Ok(WriteSummary {
            nodes_merged: batch.node_count(),
            relationships_merged: batch.relationship_count(),
        })
    }

    async fn run_rule(&self, rule: &EnrichmentRule) -> Result<u64, GraphError> {
        let created: i64 = self
            .query_scalar(Query::new(rule.statement.to_string()), "created")
            .await?
            .ok_or_else(|| GraphError::MissingRuleCount(rule.name.to_string()))?;
        Ok(created.max(0) as u64)
    }

    async fn count_stub_nodes(&self) -> Result<u64, GraphError> {
        let count: i64 = self
            .query_scalar(
                Query::new("MATCH (n) WHERE n._stub = true RETURN count(n) AS count".to_string()),
                "count",
            )
            .await?
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }
}

/// `MERGE (n:Label {id}) SET props REMOVE n._stub` for one node row.
fn node_merge_query(label: &str, row: &NodeRow) -> Query {
    let mut query = Query::new(node_merge_cypher(label, row)).param("key", row.key.as_str());
    for (i, value) in row.properties.values().enumerate() {
        query = bind(query, &format!("v{i}"), value);
    }
    query
}

fn node_merge_cypher(label: &str, row: &NodeRow) -> String {
    let mut cypher = format!("MERGE (n:`{label}` {{{KEY_PROPERTY}: $key}})\n");
    if !row.properties.is_empty() {
        let sets: Vec<String> = row
            .properties
            .keys()
            .enumerate()
            .map(|(i, name)| format!("n.`{name}` = $v{i}"))
            .collect();
        cypher.push_str(&format!("SET {}\n", sets.join(", ")));
    }
    cypher.push_str("REMOVE n._stub");
    cypher
}

/// Endpoint merges (stub on create) plus the relationship merge, with any
/// identity properties inside the MERGE pattern.
fn rel_merge_query(group: &RelGroup, row: &RelRow) -> Query {
    let mut query = Query::new(rel_merge_cypher(group, row))
        .param("from_key", row.from_key.as_str())
        .param("to_key", row.to_key.as_str());
    for (i, name) in group.identity_props.iter().enumerate() {
        let value = row.properties.get(name).cloned().unwrap_or(Value::Null);
        query = bind(query, &format!("k{i}"), &value);
    }
    for (i, (name, value)) in row.properties.iter().enumerate() {
        if group.identity_props.contains(name) {
            continue;
        }
        query = bind(query, &format!("v{i}"), value);
    }
    query
}

fn rel_merge_cypher(group: &RelGroup, row: &RelRow) -> String {
    let mut cypher = format!(
        "MERGE (from:`{}` {{{KEY_PROPERTY}: $from_key}})\n\
         ON CREATE SET from._stub = true\n\
         MERGE (to:`{}` {{{KEY_PROPERTY}: $to_key}})\n\
         ON CREATE SET to._stub = true\n",
        group.from_label, group.to_label
    );

    let identity: Vec<String> = group
        .identity_props
        .iter()
        .enumerate()
        .map(|(i, name)| format!("`{name}`: $k{i}"))
        .collect();
    if identity.is_empty() {
        cypher.push_str(&format!("MERGE (from)-[r:`{}`]->(to)", group.rel_type));
    } else {
        cypher.push_str(&format!(
            "MERGE (from)-[r:`{}` {{{}}}]->(to)",
            group.rel_type,
            identity.join(", ")
        ));
    }

    let sets: Vec<String> = row
        .properties
        .iter()
        .enumerate()
        .filter(|(_, (name, _))| !group.identity_props.contains(name))
        .map(|(i, (name, _))| format!("r.`{name}` = $v{i}"))
        .collect();
    if !sets.is_empty() {
        cypher.push_str(&format!("\nSET {}", sets.join(", ")));
    }
    cypher
}

/// Bind one JSON value as a Cypher parameter. Nested objects become JSON
/// strings — the property graph holds scalars and homogeneous lists only.
fn bind(query: Query, name: &str, value: &Value) -> Query {
    match value {
        Value::String(s) => query.param(name, s.as_str()),
        Value::Bool(b) => query.param(name, *b),
        Value::Number(n) if n.is_i64() => query.param(name, n.as_i64().unwrap_or(0)),
        Value::Number(n) => query.param(name, n.as_f64().unwrap_or(0.0)),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let list: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            query.param(name, list)
        }
        Value::Array(items) if items.iter().all(Value::is_i64) => {
            let list: Vec<i64> = items.iter().filter_map(Value::as_i64).collect();
            query.param(name, list)
        }
        Value::Array(items) => {
            let list: Vec<String> = items.iter().map(Value::to_string).collect();
            query.param(name, list)
        }
        Value::Null => query.param(name, ""),
        other => query.param(name, other.to_string()),
    }
}
