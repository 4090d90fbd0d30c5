//! Tendergraph graph layer.
//!
//! The [`GraphStore`] boundary executes idempotent merge batches and
//! enrichment rules against a property graph. [`Neo4jStore`] implements it
//! over neo4rs; [`MemoryGraph`] is the fault-injecting fake used by engine
//! tests. On top of the boundary sit the sync engine (document batches →
//! merge transactions, checkpointed), the enrichment engine (derived
//! relationships from loaded graph state) and the run orchestrator.

pub mod enrich;
pub mod error;
pub mod memory;
pub mod neo4j;
pub mod run;
pub mod schema;
pub mod store;
pub mod sync;

pub use enrich::{builtin_rules, enrich, EnrichmentRule};
pub use error::GraphError;
pub use memory::MemoryGraph;
pub use neo4j::{Neo4jConfig, Neo4jStore};
pub use run::run;
pub use schema::initialize_schema;
pub use store::{GraphCounts, GraphStore, MergeBatch, WriteSummary};
pub use sync::{sync_collection, SyncOptions};
