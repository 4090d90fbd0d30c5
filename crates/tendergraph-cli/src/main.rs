//! tendergraph — document-store → Neo4j synchronization and enrichment.

use clap::Parser;
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tendergraph_core::CancelFlag;

mod commands;
mod output;
mod settings;

use commands::Cli;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "tendergraph=debug,tendergraph_core=debug,tendergraph_store=debug,tendergraph_graph=debug"
    } else {
        "tendergraph=info,tendergraph_core=info,tendergraph_store=info,tendergraph_graph=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Ctrl-C stops issuing new batches; the in-flight batch finishes or
    // fails whole, never half-committed.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; letting the in-flight batch settle");
                cancel.cancel();
            }
        });
    }

    let code = match cli.execute(cancel).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            2
        }
    };
    std::process::exit(code);
}
