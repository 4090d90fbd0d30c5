//! Run orchestration: concurrent per-collection syncs, then enrichment.
//!
//! Configuration is validated before any I/O. Collections sync concurrently
//! (batches stay serialized within each collection); enrichment runs once
//! every sync settles, gated per rule on the collections it requires.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use tendergraph_core::{CancelFlag, ConfigError, MapperRegistry, RunConfig, RunReport, SyncReport};
use tendergraph_store::{CheckpointTracker, DocumentStore};

use crate::enrich::{self, builtin_rules, EnrichmentRule};
use crate::store::GraphStore;
use crate::sync::{sync_collection, SyncOptions};

/// Execute a full run. Fails fast on configuration errors; every other
/// failure is captured in the report.
pub async fn run(
    config: &RunConfig,
    registry: &MapperRegistry,
    docs: Arc<dyn DocumentStore>,
    graph: Arc<dyn GraphStore>,
    tracker: Arc<CheckpointTracker>,
    cancel: CancelFlag,
) -> Result<RunReport, ConfigError> {
    config.validate()?;

    // Resolve mappers and rules up front — a typo in a collection or rule
    // name must fail before the first document is read.
    let mut passes = Vec::with_capacity(config.collections.len());
    for collection in &config.collections {
        passes.push((collection.clone(), registry.require(collection)?));
    }
    let rules = resolve_rules(config)?;

    let options = SyncOptions {
        batch_size: config.batch_size,
        full_resync: config.full_resync,
        retry: config.retry.clone(),
    };

    let mut tasks: JoinSet<SyncReport> = JoinSet::new();
    for (collection, mapper) in passes {
        let docs = Arc::clone(&docs);
        let graph = Arc::clone(&graph);
        let tracker = Arc::clone(&tracker);
        let options = options.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            sync_collection(
                docs.as_ref(),
                graph.as_ref(),
                tracker.as_ref(),
                &collection,
                mapper,
                &options,
                &cancel,
            )
            .await
        });
    }

    let mut report = RunReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(sync_report) => report.syncs.push(sync_report),
            Err(e) => warn!(error = %e, "Sync task panicked"),
        }
    }
    report.syncs.sort_by(|a, b| a.collection.cmp(&b.collection));

    if !config.skip_enrichment && !cancel.is_cancelled() {
        let blocked: HashSet<String> = report
            .syncs
            .iter()
            .filter(|s| s.is_fatal() || s.cancelled)
            .map(|s| s.collection.clone())
            .collect();
        report.enrichment = Some(enrich::enrich(graph.as_ref(), &rules, &blocked).await);
    }

    match graph.count_stub_nodes().await {
        Ok(count) => report.unresolved_references = count,
        Err(e) => warn!(error = %e, "Could not count unresolved references"),
    }

    info!(
        collections = report.syncs.len(),
        status = ?report.status(),
        unresolved = report.unresolved_references,
        "Run complete"
    );
    Ok(report)
}

fn resolve_rules(config: &RunConfig) -> Result<Vec<EnrichmentRule>, ConfigError> {
    let catalogue = builtin_rules();
    match &config.rules {
        None => Ok(catalogue),
        Some(names) => {
            let mut selected = Vec::with_capacity(names.len());
            for name in names {
                let rule = catalogue
                    .iter()
                    .find(|r| r.name == name)
                    .ok_or_else(|| ConfigError::UnknownRule(name.clone()))?;
                selected.push(rule.clone());
            }
            Ok(selected)
        }
    }
}
