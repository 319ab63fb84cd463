//! Claims Analysis Pipeline
//!
//! Coordinates a complete batch run: discovering input files, loading the
//! pharmacy snapshot, parsing events, feeding them to the
//! [`ReconciliationEngine`], and writing the derived reports.
//!
//! ## Processing Pipeline
//!
//! 1. **Discovery**: finds pharmacy CSVs and claim / reversal JSON files
//! 2. **Pharmacy map**: loads NPI -> chain once, before any event is applied
//! 3. **Parsing**: parses event files in parallel chunks, dropping invalid records
//! 4. **Reconciliation**: applies all claims, then all reversals, sequentially
//! 5. **Reporting**: builds the three views and writes them atomically
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use claims_processor::analyzer::{ClaimsAnalyzer, ProcessOptions};
//! use claims_processor::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = ClaimsAnalyzer::with_config(Config::load()?);
//! let options = ProcessOptions {
//!     pharmacies: vec!["data/pharmacies".into()],
//!     claims: vec!["data/claims".into()],
//!     reverts: vec!["data/reverts".into()],
//!     out_dir: "out".into(),
//!     json_output: false,
//! };
//!
//! let summary = analyzer.run_batch(&options)?;
//! println!("{} claims stored", summary.claims_stored);
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::file_discovery::discover_files;
use crate::logging::new_run_id;
use crate::models::PharmacyMap;
use crate::parser::{EventParser, ParseStats};
use crate::pharmacies::load_pharmacy_map;
use crate::reconciler::{Counters, ReconciliationEngine};
use crate::reports::ReportSet;
use crate::writer::{write_reports, WrittenReports};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn};

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub pharmacies: Vec<PathBuf>,
    pub claims: Vec<PathBuf>,
    pub reverts: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub json_output: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub metrics: usize,
    pub top_chains: usize,
    pub top_quantities: usize,
}

impl RowCounts {
    pub fn of(reports: &ReportSet) -> Self {
        Self {
            metrics: reports.metrics.len(),
            top_chains: reports.top_chains.len(),
            top_quantities: reports.top_quantities.len(),
        }
    }
}

/// Outcome of a run (or of the streaming loop so far).
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub pharmacies: usize,
    pub claim_files: ParseStats,
    pub reversal_files: ParseStats,
    pub claims_stored: usize,
    pub active_claims: usize,
    pub pending_reversals: u64,
    pub counters: Counters,
    pub rows: RowCounts,
    pub outputs: Option<WrittenReports>,
}

impl RunSummary {
    pub fn new(
        run_id: String,
        engine: &ReconciliationEngine,
        claim_files: ParseStats,
        reversal_files: ParseStats,
        reports: &ReportSet,
        outputs: Option<WrittenReports>,
    ) -> Self {
        Self {
            run_id,
            pharmacies: engine.pharmacies().len(),
            claim_files,
            reversal_files,
            claims_stored: engine.claims().len(),
            active_claims: engine.claims().active_records().count(),
            pending_reversals: engine.pending_reversals_total(),
            counters: engine.counters().clone(),
            rows: RowCounts::of(reports),
            outputs,
        }
    }
}

pub struct ClaimsAnalyzer {
    config: Config,
}

impl ClaimsAnalyzer {
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover pharmacy CSV files under `paths` and load them into one map.
    pub fn load_pharmacies(&self, paths: &[PathBuf]) -> Result<PharmacyMap> {
        let files = discover_files(paths, self.config.processing.recursive).csv_files;
        if files.is_empty() {
            warn!(paths = ?paths, "No pharmacy CSV files found; every claim will be rejected");
        }
        load_pharmacy_map(&files)
    }

    pub fn event_parser(&self) -> EventParser {
        EventParser::new(self.config.processing.batch_size)
    }

    /// Run one complete batch and write the reports.
    pub fn run_batch(&self, options: &ProcessOptions) -> Result<RunSummary> {
        let run_id = new_run_id();
        let span = info_span!("batch_run", run_id = %run_id);
        let _enter = span.enter();

        let recursive = self.config.processing.recursive;
        let claim_files = discover_files(&options.claims, recursive).json_files;
        let reversal_files = discover_files(&options.reverts, recursive).json_files;
        info!(
            claim_files = claim_files.len(),
            reversal_files = reversal_files.len(),
            "Discovered event files"
        );

        let pharmacies = Arc::new(self.load_pharmacies(&options.pharmacies)?);
        let mut engine = ReconciliationEngine::new(pharmacies);
        let parser = self.event_parser();

        let claims = parser.parse_claim_files(&claim_files);
        engine.apply_all(claims.events);

        let reversals = parser.parse_reversal_files(&reversal_files);
        engine.apply_all(reversals.events);

        let reports = ReportSet::from_engine(&engine);
        let written = write_reports(&options.out_dir, &reports, &self.config.output)?;

        let summary = RunSummary::new(
            run_id,
            &engine,
            claims.stats,
            reversals.stats,
            &reports,
            Some(written),
        );
        info!(
            claims_stored = summary.claims_stored,
            active_claims = summary.active_claims,
            anomalies = summary.counters.total(),
            "Batch run complete"
        );
        Ok(summary)
    }
}
