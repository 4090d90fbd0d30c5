//! Tendergraph Core
//!
//! Domain model and contracts for the document-store → Neo4j
//! synchronization engine: canonical documents, graph element specs,
//! the mapper contract and registry, run configuration and reports.

pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod mappers;
pub mod report;

pub use config::{CancelFlag, RetryPolicy, RunConfig};
pub use document::CanonicalDocument;
pub use error::{ConfigError, MapperError};
pub use graph::{MapperResult, NodeRef, NodeSpec, RelationshipSpec};
pub use mapper::{Mapper, MapperRegistry};
pub use report::{
    DocumentFailure, EnrichmentReport, RuleOutcome, RunReport, RunStatus, SyncReport,
};
