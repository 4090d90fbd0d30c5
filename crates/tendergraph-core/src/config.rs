//! Run configuration.
//!
//! One immutable value describes an entire run: which collections to sync,
//! which enrichment rules to apply, batching and retry parameters. Passed
//! into the engine at invocation; nothing here is module-level state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Bounded exponential backoff for graph-write (and document-fetch) retries.
/// An explicit parameter of the store boundaries, not behavior buried in a
/// client wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_ms", default = "default_base_delay")]
    pub base_delay: Duration,
    #[serde(with = "duration_ms", default = "default_max_delay")]
    pub max_delay: Duration,
}

fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given 1-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// A policy that never retries. Keeps failure-path tests fast.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

/// Immutable description of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Collections to sync, in declaration order. Syncs may run concurrently
    /// across collections; order carries no guarantee.
    pub collections: Vec<String>,
    /// Documents per merge batch.
    pub batch_size: usize,
    /// Ignore checkpoints and resync every collection from the beginning.
    pub full_resync: bool,
    /// Enrichment rule names to run after sync. `None` = the full catalogue.
    pub rules: Option<Vec<String>>,
    /// Skip the enrichment pass entirely.
    pub skip_enrichment: bool,
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            batch_size: 1000,
            full_resync: false,
            rules: None,
            skip_enrichment: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Structural validation. Mapper/rule existence is checked by the
    /// orchestrator against its registry and catalogue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy);
        }
        Ok(())
    }
}

/// Run-level cancellation flag, shared between the CLI signal handler and
/// the sync engine. Cancellation stops new batches from being issued; an
/// in-flight batch still commits or fails as a whole.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
