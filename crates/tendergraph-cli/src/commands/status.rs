//! `status`: checkpoint positions and graph totals.

use anyhow::Result;

use tendergraph_graph::Neo4jStore;
use tendergraph_store::CheckpointTracker;

use crate::output;
use crate::settings::Settings;

pub async fn execute(settings: &Settings) -> Result<i32> {
    let tracker = CheckpointTracker::open(&settings.checkpoint_db)?;
    let checkpoints = tracker.all()?;

    let graph = Neo4jStore::connect(&settings.neo4j).await?;
    let counts = graph.counts().await?;

    output::print_status(&checkpoints, &counts);
    Ok(0)
}
