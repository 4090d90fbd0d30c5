//! `enrich`: run derived-relationship rules against the loaded graph.

use std::collections::HashSet;

use anyhow::{bail, Result};
use clap::Args;

use tendergraph_graph::{builtin_rules, enrich, EnrichmentRule, Neo4jStore};

use crate::output;
use crate::settings::Settings;

#[derive(Args)]
pub struct EnrichArgs {
    /// Rules to run (defaults to the full catalogue)
    pub rules: Vec<String>,

    /// Emit the report as JSON instead of formatted text
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: EnrichArgs, settings: &Settings) -> Result<i32> {
    let rules = select_rules(&args.rules)?;
    let graph = Neo4jStore::connect(&settings.neo4j).await?;

    // Standalone enrichment trusts the operator that the graph is loaded;
    // no collection is treated as blocked.
    let report = enrich(&graph, &rules, &HashSet::new()).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_enrichment(&report);
    }

    let code = if report.failed_rules().next().is_some() {
        1
    } else {
        0
    };
    Ok(code)
}

fn select_rules(names: &[String]) -> Result<Vec<EnrichmentRule>> {
    let catalogue = builtin_rules();
    if names.is_empty() {
        return Ok(catalogue);
    }
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        match catalogue.iter().find(|r| r.name == name) {
            Some(rule) => selected.push(rule.clone()),
            None => bail!("unknown enrichment rule: {name}"),
        }
    }
    Ok(selected)
}
