//! `init-schema`: create uniqueness constraints.

use anyhow::Result;
use colored::Colorize;

use tendergraph_graph::{initialize_schema, Neo4jStore};

use crate::settings::Settings;

pub async fn execute(settings: &Settings) -> Result<i32> {
    let graph = Neo4jStore::connect(&settings.neo4j).await?;
    initialize_schema(&graph).await?;
    println!("{} graph schema initialized", "✓".green());
    Ok(0)
}
