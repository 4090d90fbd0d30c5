//! Graph-layer errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("graph store error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] tendergraph_store::StoreError),

    #[error("enrichment rule '{0}' returned no count")]
    MissingRuleCount(String),

    #[error("failed to decode result field '{0}': {1}")]
    FieldDecode(String, String),

    #[error("injected failure: {0}")]
    Injected(String),
}
