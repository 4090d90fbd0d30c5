//! Neo4j schema initialization (uniqueness constraints).
//!
//! Every label is keyed by its `id` property; the constraints back the
//! merge-by-identity guarantees of the sync engine.

use neo4rs::Query;
use tracing::info;

use crate::error::GraphError;
use crate::neo4j::Neo4jStore;

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT tender_id IF NOT EXISTS FOR (n:Tender) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT contract_id IF NOT EXISTS FOR (n:Contract) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (n:Entity) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT location_id IF NOT EXISTS FOR (n:Location) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT cpv_id IF NOT EXISTS FOR (n:CPV) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT document_id IF NOT EXISTS FOR (n:Document) REQUIRE n.id IS UNIQUE",
    "CREATE CONSTRAINT person_id IF NOT EXISTS FOR (n:Person) REQUIRE n.id IS UNIQUE",
];

/// Apply all constraints. Safe to run repeatedly — every statement carries
/// IF NOT EXISTS.
pub async fn initialize_schema(store: &Neo4jStore) -> Result<(), GraphError> {
    for statement in SCHEMA_STATEMENTS {
        store.execute(Query::new((*statement).to_string())).await?;
    }
    info!(statements = SCHEMA_STATEMENTS.len(), "Graph schema initialized");
    Ok(())
}
