//! The sync engine: document pages → mapper → idempotent merge batches.
//!
//! One pass over one collection. Batches commit in document order; the
//! checkpoint advances only after the graph store acknowledged the batch,
//! so a crash or failure never leaves the checkpoint ahead of graph state.
//! A mapper failure skips its document; a batch write failure (after
//! bounded retries) halts the collection at the last committed checkpoint.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tendergraph_core::{
    CancelFlag, DocumentFailure, Mapper, MapperResult, RetryPolicy, SyncReport,
};
use tendergraph_store::{CheckpointStatus, CheckpointTracker, DocumentStore};

use crate::error::GraphError;
use crate::store::{GraphStore, MergeBatch};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub full_resync: bool,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            full_resync: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Sync one collection. Recovered errors land in the report; the function
/// itself only fails through the report's `fatal` field.
pub async fn sync_collection(
    docs: &dyn DocumentStore,
    graph: &dyn GraphStore,
    tracker: &CheckpointTracker,
    collection: &str,
    mapper: Arc<dyn Mapper>,
    options: &SyncOptions,
    cancel: &CancelFlag,
) -> SyncReport {
    let mut report = SyncReport::new(collection);

    if options.full_resync {
        if let Err(e) = tracker.reset(collection) {
            report.fatal = Some(format!("failed to reset checkpoint: {e}"));
            return report;
        }
    }

    let mut position = match tracker.get(collection) {
        Ok(checkpoint) => checkpoint.and_then(|c| c.position),
        Err(e) => {
            report.fatal = Some(format!("failed to read checkpoint: {e}"));
            return report;
        }
    };
    if let Err(e) = tracker.set_status(collection, CheckpointStatus::InProgress) {
        report.fatal = Some(format!("failed to mark checkpoint: {e}"));
        return report;
    }

    info!(
        collection,
        resume_after = position.as_deref().unwrap_or("<start>"),
        batch_size = options.batch_size,
        "Starting sync pass"
    );

    loop {
        if cancel.is_cancelled() {
            warn!(collection, "Sync cancelled; no further batches issued");
            report.cancelled = true;
            break;
        }

        let page = match docs
            .fetch_page(collection, position.as_deref(), options.batch_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                report.fatal = Some(format!("document fetch failed: {e}"));
                break;
            }
        };
        if page.is_empty() {
            break;
        }

        report.documents_read += page.len();
        let last_id = page.last().map(|d| d.id.clone()).unwrap_or_default();

        let mut results: Vec<MapperResult> = Vec::with_capacity(page.len());
        for doc in &page {
            match mapper.map(doc) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(collection, document_id = %doc.id, error = %e, "Mapper failed, skipping document");
                    report.failures.push(DocumentFailure {
                        document_id: doc.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let batch = MergeBatch::from_results(&results);
        if !batch.is_empty() {
            match apply_with_retry(graph, &batch, &options.retry, collection).await {
                Ok(summary) => {
                    report.nodes_merged += summary.nodes_merged;
                    report.relationships_merged += summary.relationships_merged;
                }
                Err(e) => {
                    // Checkpoint stays at the previous batch: nothing from
                    // this batch was committed.
                    report.fatal = Some(format!(
                        "batch write failed after {} attempts: {e}",
                        options.retry.max_attempts
                    ));
                    let _ = tracker.set_status(collection, CheckpointStatus::Failed);
                    break;
                }
            }
        }

        // Graph write acknowledged (or the whole batch mapped to nothing):
        // these documents are processed, advance past them.
        if let Err(e) = tracker.commit(collection, &last_id) {
            report.fatal = Some(format!("checkpoint commit failed: {e}"));
            break;
        }
        report.checkpoint = Some(last_id.clone());
        position = Some(last_id);

        debug!(
            collection,
            documents = report.documents_read,
            checkpoint = position.as_deref().unwrap_or(""),
            "Batch committed"
        );

        if page.len() < options.batch_size {
            break;
        }
    }

    if report.fatal.is_none() && !report.cancelled {
        let _ = tracker.set_status(collection, CheckpointStatus::Completed);
    }

    info!(
        collection,
        documents = report.documents_read,
        nodes = report.nodes_merged,
        relationships = report.relationships_merged,
        failures = report.failures.len(),
        fatal = report.fatal.is_some(),
        "Sync pass finished"
    );
    report
}

async fn apply_with_retry(
    graph: &dyn GraphStore,
    batch: &MergeBatch,
    retry: &RetryPolicy,
    collection: &str,
) -> Result<crate::store::WriteSummary, GraphError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match graph.apply_batch(batch).await {
            Ok(summary) => return Ok(summary),
            Err(e) if attempt < retry.max_attempts => {
                let delay = retry.delay_for(attempt);
                warn!(
                    collection,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Batch write failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tendergraph_core::{mappers, CanonicalDocument, MapperError, NodeSpec, RelationshipSpec};
    use tendergraph_store::MemoryStore;

    use crate::memory::MemoryGraph;

    fn options(batch_size: usize) -> SyncOptions {
        SyncOptions {
            batch_size,
            full_resync: false,
            retry: RetryPolicy::none(),
        }
    }

    fn contracts_mapper() -> Arc<dyn Mapper> {
        mappers::default_registry().require("contracts_gold").unwrap()
    }

    fn seed_contract(store: &MemoryStore, id: &str) {
        store.insert(
            "contracts_gold",
            id,
            json!({
                "contract_id": id,
                "initial_price": 1000,
                "contracted_vats": ["E2"],
                "contracting_agency_vats": ["E1"]
            }),
        );
    }

    /// A minimal mapper: one contract document yields a Contract node, two
    /// Entity nodes and two edges. Exactly that lands in the graph, and a
    /// second pass over the same document changes nothing.
    #[tokio::test]
    async fn test_engine_merges_exactly_what_the_mapper_emits() {
        let docs = MemoryStore::new();
        docs.insert(
            "contracts_gold",
            "C1",
            json!({"buyer": "E1", "supplier": "E2", "value": 1000}),
        );
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();

        let mapper: Arc<dyn Mapper> = Arc::new(|doc: &CanonicalDocument| -> Result<MapperResult, MapperError> {
            let contract = NodeSpec::new("Contract", doc.id.as_str())
                .prop("value", doc.get("value").cloned().unwrap_or_default());
            let buyer = NodeSpec::new("Entity", doc.str_field("buyer").unwrap_or_default());
            let supplier = NodeSpec::new("Entity", doc.str_field("supplier").unwrap_or_default());
            Ok(MapperResult {
                relationships: vec![
                    RelationshipSpec::new(
                        "AWARDS_CONTRACT",
                        buyer.reference(),
                        contract.reference(),
                    ),
                    RelationshipSpec::new(
                        "SIGNED_CONTRACT",
                        supplier.reference(),
                        contract.reference(),
                    ),
                ],
                nodes: vec![contract, buyer, supplier],
            })
        });

        for _ in 0..2 {
            let report = sync_collection(
                &docs,
                &graph,
                &tracker,
                "contracts_gold",
                Arc::clone(&mapper),
                &SyncOptions {
                    full_resync: true,
                    ..options(100)
                },
                &cancel,
            )
            .await;
            assert!(report.fatal.is_none());
            assert_eq!(graph.node_count(), 3);
            assert_eq!(graph.edge_count(), 2);
        }
    }

    /// One contract with a buyer and a supplier yields Tender + Contract
    /// plus stub entities, and re-syncing changes nothing.
    #[tokio::test]
    async fn test_sync_and_resync_are_idempotent() {
        let docs = MemoryStore::new();
        seed_contract(&docs, "C1");
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();

        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &options(100),
            &cancel,
        )
        .await;
        assert!(report.fatal.is_none());
        assert_eq!(report.documents_read, 1);
        // Tender + Contract merged, E1/E2 materialize as stubs.
        assert_eq!(graph.node_count(), 4);
        let nodes_before = graph.node_count();
        let edges_before = graph.edge_count();

        // Full resync over unchanged documents: zero net new state.
        let full = SyncOptions {
            full_resync: true,
            ..options(100)
        };
        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &full,
            &cancel,
        )
        .await;
        assert!(report.fatal.is_none());
        assert_eq!(graph.node_count(), nodes_before);
        assert_eq!(graph.edge_count(), edges_before);
    }

    #[tokio::test]
    async fn test_incremental_resume_skips_synced_documents() {
        let docs = MemoryStore::new();
        seed_contract(&docs, "C1");
        seed_contract(&docs, "C2");
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();

        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &options(10),
            &cancel,
        )
        .await;
        assert_eq!(report.documents_read, 2);
        assert_eq!(report.checkpoint.as_deref(), Some("C2"));

        // New document after the checkpoint; only it is read.
        seed_contract(&docs, "C3");
        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &options(10),
            &cancel,
        )
        .await;
        assert_eq!(report.documents_read, 1);
        assert_eq!(report.checkpoint.as_deref(), Some("C3"));
    }

    /// 100 documents, one of which cannot be mapped: 99 merge, 1 failure
    /// reported, run completes.
    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let docs = MemoryStore::new();
        for i in 0..100 {
            let id = format!("C{i:03}");
            if i == 42 {
                docs.insert("contracts_gold", &id, json!({"broken": true}));
            } else {
                seed_contract(&docs, &id);
            }
        }
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();

        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &options(10),
            &cancel,
        )
        .await;

        assert!(report.fatal.is_none());
        assert_eq!(report.documents_read, 100);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].document_id, "C042");
        // 99 Tender + 99 Contract + stubs E1, E2.
        assert_eq!(graph.node_count(), 200);
        assert_eq!(report.checkpoint.as_deref(), Some("C099"));
    }

    /// A batch that exhausts its retries halts the collection with the
    /// checkpoint still at the last committed batch.
    #[tokio::test]
    async fn test_batch_failure_leaves_checkpoint_behind() {
        let docs = MemoryStore::new();
        for id in ["C1", "C2", "C3", "C4"] {
            seed_contract(&docs, id);
        }
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();

        let opts = SyncOptions {
            batch_size: 2,
            full_resync: false,
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: std::time::Duration::ZERO,
                max_delay: std::time::Duration::ZERO,
            },
        };

        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &opts,
            &cancel,
        )
        .await;
        assert!(report.fatal.is_none());
        assert_eq!(report.checkpoint.as_deref(), Some("C4"));

        // Two more documents arrive; every write attempt for them fails.
        seed_contract(&docs, "C5");
        seed_contract(&docs, "C6");
        graph.fail_next_batches(2);
        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &opts,
            &cancel,
        )
        .await;

        assert!(report.fatal.is_some());
        assert_eq!(report.checkpoint, None);
        let checkpoint = tracker.get("contracts_gold").unwrap().unwrap();
        assert_eq!(checkpoint.position.as_deref(), Some("C4"));
        assert_eq!(checkpoint.status, CheckpointStatus::Failed);
    }

    /// Crash replay: reprocessing a batch that committed to the graph but
    /// not to the checkpoint produces no duplicate state.
    #[tokio::test]
    async fn test_replay_after_lost_checkpoint_is_harmless() {
        let docs = MemoryStore::new();
        seed_contract(&docs, "C1");
        seed_contract(&docs, "C2");
        let graph = MemoryGraph::new();
        let cancel = CancelFlag::new();

        // First run commits graph state; its checkpoint is then lost,
        // simulating a crash between graph ack and checkpoint write.
        let lost_tracker = CheckpointTracker::in_memory().unwrap();
        sync_collection(
            &docs,
            &graph,
            &lost_tracker,
            "contracts_gold",
            contracts_mapper(),
            &options(10),
            &cancel,
        )
        .await;
        let nodes = graph.node_count();
        let edges = graph.edge_count();

        let fresh_tracker = CheckpointTracker::in_memory().unwrap();
        let report = sync_collection(
            &docs,
            &graph,
            &fresh_tracker,
            "contracts_gold",
            contracts_mapper(),
            &options(10),
            &cancel,
        )
        .await;
        assert_eq!(report.documents_read, 2);
        assert_eq!(graph.node_count(), nodes);
        assert_eq!(graph.edge_count(), edges);
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_new_batches() {
        let docs = MemoryStore::new();
        seed_contract(&docs, "C1");
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let report = sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            contracts_mapper(),
            &options(10),
            &cancel,
        )
        .await;
        assert!(report.cancelled);
        assert_eq!(report.documents_read, 0);
        assert_eq!(graph.node_count(), 0);
    }

    /// Placeholder reconciliation across collections: the contract batch
    /// references entities that sync later with full properties.
    #[tokio::test]
    async fn test_stub_reconciliation_across_collections() {
        let docs = MemoryStore::new();
        seed_contract(&docs, "C1");
        docs.insert(
            "entities_gold",
            "E2",
            json!({"nif": "E2", "description": "ACME", "valid_nif": true, "district": "Porto"}),
        );
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();
        let registry = mappers::default_registry();

        sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            registry.require("contracts_gold").unwrap(),
            &options(10),
            &cancel,
        )
        .await;
        assert!(graph.is_stub("Entity", "E2"));

        sync_collection(
            &docs,
            &graph,
            &tracker,
            "entities_gold",
            registry.require("entities_gold").unwrap(),
            &options(10),
            &cancel,
        )
        .await;

        assert!(!graph.is_stub("Entity", "E2"));
        let entity = graph.node("Entity", "E2").unwrap();
        assert_eq!(entity["entity_name"], json!("ACME"));
        // E1 was never synced: still a stub, surfaced as unresolved.
        assert!(graph.is_stub("Entity", "E1"));
        assert_eq!(graph.count_stub_nodes().await.unwrap(), 1);
    }

    /// Contract classifications reference CPV codes by id; syncing the
    /// classification structure collection resolves those placeholders.
    #[tokio::test]
    async fn test_cpv_placeholders_resolved_by_structure_sync() {
        let docs = MemoryStore::new();
        docs.insert(
            "contracts_gold",
            "C1",
            json!({"contract_id": "C1", "cpvs": ["45000000-7"]}),
        );
        docs.insert(
            "cpv_structure_silver",
            "45000000-7",
            json!({"code": "45000000-7", "labels": "Construction work", "level": "Division"}),
        );
        let graph = MemoryGraph::new();
        let tracker = CheckpointTracker::in_memory().unwrap();
        let cancel = CancelFlag::new();
        let registry = mappers::default_registry();

        sync_collection(
            &docs,
            &graph,
            &tracker,
            "contracts_gold",
            registry.require("contracts_gold").unwrap(),
            &options(10),
            &cancel,
        )
        .await;
        assert!(graph.is_stub("CPV", "45000000-7"));

        sync_collection(
            &docs,
            &graph,
            &tracker,
            "cpv_structure_silver",
            registry.require("cpv_structure_silver").unwrap(),
            &options(10),
            &cancel,
        )
        .await;

        assert!(!graph.is_stub("CPV", "45000000-7"));
        let cpv = graph.node("CPV", "45000000-7").unwrap();
        assert_eq!(cpv["label"], json!("Construction work"));
        assert_eq!(graph.count_stub_nodes().await.unwrap(), 0);
    }
}
