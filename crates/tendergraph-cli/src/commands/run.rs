//! `run` and `sync`: checkpointed collection sync plus enrichment.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use tendergraph_core::{mappers, CancelFlag, RunConfig};
use tendergraph_graph::Neo4jStore;
use tendergraph_store::{CheckpointTracker, CouchStore};

use crate::output;
use crate::settings::Settings;

#[derive(Args)]
pub struct RunArgs {
    /// Collections to sync (defaults to the configured set)
    pub collections: Vec<String>,

    /// Ignore checkpoints and resync from the beginning
    #[arg(long)]
    pub full: bool,

    /// Documents per merge batch
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,

    /// Enrichment rule to run after sync (repeatable; defaults to all)
    #[arg(long = "rule", value_name = "RULE")]
    pub rules: Vec<String>,

    /// Skip the enrichment pass
    #[arg(long)]
    pub skip_enrichment: bool,

    /// Emit the run report as JSON instead of formatted text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Collection to sync
    pub collection: String,

    /// Ignore the checkpoint and resync from the beginning
    #[arg(long)]
    pub full: bool,

    /// Documents per merge batch
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,

    /// Emit the run report as JSON instead of formatted text
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn into_run(self) -> RunArgs {
        RunArgs {
            collections: vec![self.collection],
            full: self.full,
            batch_size: self.batch_size,
            rules: Vec::new(),
            skip_enrichment: true,
            json: self.json,
        }
    }
}

pub async fn execute(args: RunArgs, settings: &Settings, cancel: CancelFlag) -> Result<i32> {
    let collections = if args.collections.is_empty() {
        settings.collections.clone()
    } else {
        args.collections
    };

    let config = RunConfig {
        collections,
        batch_size: args.batch_size,
        full_resync: args.full,
        rules: (!args.rules.is_empty()).then_some(args.rules),
        skip_enrichment: args.skip_enrichment,
        retry: settings.retry.clone(),
    };

    let registry = mappers::default_registry();
    let docs = Arc::new(CouchStore::new(&settings.couchdb)?);
    let graph = Arc::new(Neo4jStore::connect(&settings.neo4j).await?);
    let tracker = Arc::new(CheckpointTracker::open(&settings.checkpoint_db)?);

    let report =
        tendergraph_graph::run(&config, &registry, docs, graph, tracker, cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_run_report(&report);
    }
    Ok(report.status().exit_code())
}
