//! CLI command definitions and dispatch.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tendergraph_core::CancelFlag;

use crate::settings::Settings;

pub mod enrich;
pub mod run;
pub mod schema;
pub mod status;

/// Tendergraph - gold document collections into a property graph
#[derive(Parser)]
#[command(name = "tendergraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (defaults to ./tendergraph.toml when present)
    #[arg(short, long, global = true, env = "TENDERGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync all configured collections, then run enrichment
    Run(run::RunArgs),

    /// Sync a single collection (no enrichment)
    Sync(run::SyncArgs),

    /// Run enrichment rules against the already-loaded graph
    Enrich(enrich::EnrichArgs),

    /// Create the graph uniqueness constraints
    InitSchema,

    /// Show checkpoint positions and graph totals
    Status,
}

impl Cli {
    /// Run the selected command; the returned code becomes the process exit
    /// status (0 success, 1 partial failure, 2 fatal).
    pub async fn execute(self, cancel: CancelFlag) -> Result<i32> {
        let settings = Settings::load(self.config.as_deref())?;

        match self.command {
            Commands::Run(args) => run::execute(args, &settings, cancel).await,
            Commands::Sync(args) => run::execute(args.into_run(), &settings, cancel).await,
            Commands::Enrich(args) => enrich::execute(args, &settings).await,
            Commands::InitSchema => schema::execute(&settings).await,
            Commands::Status => status::execute(&settings).await,
        }
    }
}
