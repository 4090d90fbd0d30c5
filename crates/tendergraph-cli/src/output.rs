//! Terminal output formatting.

use colored::Colorize;

use tendergraph_core::{EnrichmentReport, RunReport, RunStatus, SyncReport};
use tendergraph_graph::GraphCounts;
use tendergraph_store::{Checkpoint, CheckpointStatus};

/// Print a full run report: one line per collection, the enrichment
/// outcomes, and an overall verdict.
pub fn print_run_report(report: &RunReport) {
    println!("{}", "Sync".cyan().bold());
    for sync in &report.syncs {
        print_sync_line(sync);
    }

    if let Some(enrichment) = &report.enrichment {
        println!();
        println!("{}", "Enrichment".cyan().bold());
        print_enrichment(enrichment);
    }

    println!();
    if report.unresolved_references > 0 {
        println!(
            "{} {} referenced nodes have no synced document yet",
            "unresolved:".yellow(),
            report.unresolved_references
        );
    }

    let verdict = match report.status() {
        RunStatus::Success => "success".green().bold(),
        RunStatus::PartialFailure => "partial failure".yellow().bold(),
        RunStatus::Fatal => "fatal".red().bold(),
    };
    println!("{} {}", "Status:".bold(), verdict);
}

fn print_sync_line(sync: &SyncReport) {
    let marker = if sync.is_fatal() {
        "✗".red()
    } else if sync.cancelled || !sync.failures.is_empty() {
        "!".yellow()
    } else {
        "✓".green()
    };

    let checkpoint = sync
        .checkpoint
        .as_deref()
        .unwrap_or("(none)");
    println!(
        "  {} {:<16} {} docs, {} nodes, {} rels, checkpoint {}",
        marker,
        sync.collection,
        sync.documents_read,
        sync.nodes_merged,
        sync.relationships_merged,
        checkpoint.dimmed()
    );

    if sync.cancelled {
        println!("      {}", "cancelled before completion".yellow());
    }
    if let Some(fatal) = &sync.fatal {
        println!("      {} {}", "fatal:".red(), fatal);
    }
    for failure in &sync.failures {
        println!(
            "      {} {}: {}",
            "skipped".yellow(),
            failure.document_id,
            failure.error
        );
    }
}

pub fn print_enrichment(report: &EnrichmentReport) {
    for outcome in &report.outcomes {
        if outcome.skipped {
            println!("  {} {:<22} skipped", "-".dimmed(), outcome.rule.dimmed());
        } else if let Some(error) = &outcome.error {
            println!("  {} {:<22} {}", "✗".red(), outcome.rule, error.red());
        } else {
            println!(
                "  {} {:<22} {} relationships created",
                "✓".green(),
                outcome.rule,
                outcome.relationships_created
            );
        }
    }
}

/// Print checkpoint state and graph totals for `tendergraph status`.
pub fn print_status(checkpoints: &[Checkpoint], counts: &GraphCounts) {
    println!("{}", "Checkpoints".cyan().bold());
    if checkpoints.is_empty() {
        println!("  {}", "no collections synced yet".dimmed());
    }
    for checkpoint in checkpoints {
        let status = match checkpoint.status {
            CheckpointStatus::Completed => checkpoint.status.as_str().green(),
            CheckpointStatus::InProgress => checkpoint.status.as_str().yellow(),
            CheckpointStatus::Failed => checkpoint.status.as_str().red(),
        };
        println!(
            "  {:<16} {:<12} position {} ({})",
            checkpoint.collection,
            status,
            checkpoint.position.as_deref().unwrap_or("(none)"),
            checkpoint.updated_at.dimmed()
        );
    }

    println!();
    println!("{}", "Graph".cyan().bold());
    println!(
        "  {} nodes, {} relationships",
        counts.nodes, counts.relationships
    );
}
