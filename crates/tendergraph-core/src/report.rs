//! Run reports.
//!
//! Every recovered error is retained here with enough context (document id,
//! rule name) to re-run selectively. Nothing is silently dropped.

use serde::Serialize;

/// A single document whose mapper failed. The document was skipped; the
/// batch went ahead without it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub document_id: String,
    pub error: String,
}

/// Outcome of one collection's sync pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub collection: String,
    pub documents_read: usize,
    pub nodes_merged: usize,
    pub relationships_merged: usize,
    pub failures: Vec<DocumentFailure>,
    /// Last committed checkpoint position (document id), if any batch
    /// committed during this pass.
    pub checkpoint: Option<String>,
    /// Set when a batch exhausted its retries. The checkpoint above is the
    /// last fully committed batch; nothing past it was applied.
    pub fatal: Option<String>,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }
}

/// Outcome of one enrichment rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub relationships_created: u64,
    /// Execution error, if the rule failed. Other rules still ran.
    pub error: Option<String>,
    /// True when the rule was not attempted because a collection it
    /// requires did not complete its sync pass.
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl EnrichmentReport {
    pub fn failed_rules(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }
}

/// Overall status of a run, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Everything synced and enriched cleanly.
    Success,
    /// Recovered failures occurred (skipped documents or rules).
    PartialFailure,
    /// At least one collection halted on a batch failure, or the run was
    /// cancelled.
    Fatal,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::PartialFailure => 1,
            RunStatus::Fatal => 2,
        }
    }
}

/// Aggregate report for a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub syncs: Vec<SyncReport>,
    pub enrichment: Option<EnrichmentReport>,
    /// Placeholder nodes still carrying only identity fields after the run:
    /// relationships referenced them but no synced document ever did.
    pub unresolved_references: u64,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        if self.syncs.iter().any(|s| s.is_fatal() || s.cancelled) {
            return RunStatus::Fatal;
        }
        let recovered = self.syncs.iter().any(|s| !s.failures.is_empty())
            || self
                .enrichment
                .as_ref()
                .is_some_and(|e| e.failed_rules().next().is_some());
        if recovered {
            RunStatus::PartialFailure
        } else {
            RunStatus::Success
        }
    }
}
