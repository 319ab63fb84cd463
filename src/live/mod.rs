//! Streaming mode for continuously arriving event files
//!
//! Instead of a single batch, the streaming loop polls the claim and reversal
//! directories, feeds files it has not seen before into one long-lived
//! reconciliation engine, and rewrites the reports after every cycle that applied
//! something new.

use crate::config::StreamingConfig;
use std::path::PathBuf;
use std::time::Duration;

pub mod orchestrator;
pub mod watcher;

/// Streaming loop settings
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Delay between two directory scans
    pub poll_interval: Duration,
    /// Stop after this many cycles; run until Ctrl+C when `None`
    pub max_cycles: Option<u64>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_cycles: None,
        }
    }
}

impl From<&StreamingConfig> for LiveConfig {
    fn from(config: &StreamingConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_cycles: config.max_cycles,
        }
    }
}

/// Files that appeared since the previous scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFiles {
    pub claims: Vec<PathBuf>,
    pub reversals: Vec<PathBuf>,
}

impl NewFiles {
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty() && self.reversals.is_empty()
    }
}

/// What a single polling cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub new_claim_files: usize,
    pub new_reversal_files: usize,
    pub claims_parsed: usize,
    pub reversals_parsed: usize,
    pub reports_written: bool,
}
