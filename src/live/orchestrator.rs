//! Streaming orchestrator
//!
//! Owns the long-lived reconciliation engine for a streaming run and coordinates:
//! - Loading the pharmacy snapshot once at startup
//! - Polling for new claim and reversal files
//! - Applying new claims before new reversals within a cycle
//! - Rewriting the reports whenever a cycle brought new files

use anyhow::Result;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{info, info_span, Instrument};

use crate::analyzer::{ClaimsAnalyzer, ProcessOptions, RunSummary};
use crate::live::watcher::FileStreamWatcher;
use crate::live::{CycleReport, LiveConfig};
use crate::logging::new_run_id;
use crate::parser::{EventParser, ParseStats};
use crate::reconciler::ReconciliationEngine;
use crate::reports::ReportSet;
use crate::writer::{write_reports, WrittenReports};

pub struct StreamOrchestrator {
    analyzer: ClaimsAnalyzer,
    options: ProcessOptions,
    live: LiveConfig,
    run_id: String,
    engine: ReconciliationEngine,
    watcher: FileStreamWatcher,
    parser: EventParser,
    cycles: u64,
    claim_stats: ParseStats,
    reversal_stats: ParseStats,
    last_reports: Option<ReportSet>,
    last_written: Option<WrittenReports>,
}

impl StreamOrchestrator {
    /// Load the pharmacy map and prepare an empty engine.
    pub fn new(analyzer: ClaimsAnalyzer, options: ProcessOptions, live: LiveConfig) -> Result<Self> {
        let pharmacies = Arc::new(analyzer.load_pharmacies(&options.pharmacies)?);
        let watcher = FileStreamWatcher::new(&options.claims, &options.reverts);
        let parser = analyzer.event_parser();

        Ok(Self {
            analyzer,
            options,
            live,
            run_id: new_run_id(),
            engine: ReconciliationEngine::new(pharmacies),
            watcher,
            parser,
            cycles: 0,
            claim_stats: ParseStats::default(),
            reversal_stats: ParseStats::default(),
            last_reports: None,
            last_written: None,
        })
    }

    /// Scan once, apply whatever is new, and rewrite reports if anything changed.
    ///
    /// Reports are always written on the first cycle so the output directory is
    /// populated even before any event file shows up.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let new_files = self.watcher.discover_new_files();

        let claims = self.parser.parse_claim_files(&new_files.claims);
        let reversals = self.parser.parse_reversal_files(&new_files.reversals);
        self.claim_stats.merge(&claims.stats);
        self.reversal_stats.merge(&reversals.stats);

        let mut report = CycleReport {
            cycle: self.cycles,
            new_claim_files: new_files.claims.len(),
            new_reversal_files: new_files.reversals.len(),
            claims_parsed: claims.events.len(),
            reversals_parsed: reversals.events.len(),
            reports_written: false,
        };

        self.engine.apply_all(claims.events);
        self.engine.apply_all(reversals.events);

        if self.cycles == 1 || !new_files.is_empty() {
            let reports = ReportSet::from_engine(&self.engine);
            let written = write_reports(&self.options.out_dir, &reports, &self.analyzer.config().output)?;
            self.last_reports = Some(reports);
            self.last_written = Some(written);
            report.reports_written = true;

            info!(
                cycle = report.cycle,
                claim_files = report.new_claim_files,
                reversal_files = report.new_reversal_files,
                claims_stored = self.engine.claims().len(),
                "Streaming cycle applied new events"
            );
        }

        Ok(report)
    }

    /// Poll until Ctrl+C or until `max_cycles` cycles have run.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let span = info_span!("stream_run", run_id = %self.run_id);
        self.run_loop().instrument(span).await
    }

    async fn run_loop(&mut self) -> Result<RunSummary> {
        info!(
            poll_interval_secs = self.live.poll_interval.as_secs(),
            max_cycles = ?self.live.max_cycles,
            pharmacies = self.engine.pharmacies().len(),
            "Starting streaming mode"
        );

        let mut ticker = tokio::time::interval(self.live.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(cycles = self.cycles, "Shutdown requested, stopping streaming mode");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle()?;
                    if let Some(max_cycles) = self.live.max_cycles {
                        if report.cycle >= max_cycles {
                            info!(cycles = report.cycle, "Reached configured cycle limit");
                            break;
                        }
                    }
                }
            }
        }

        Ok(self.summary())
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn summary(&self) -> RunSummary {
        let reports = self
            .last_reports
            .clone()
            .unwrap_or_else(|| ReportSet::from_engine(&self.engine));
        RunSummary::new(
            self.run_id.clone(),
            &self.engine,
            self.claim_stats.clone(),
            self.reversal_stats.clone(),
            &reports,
            self.last_written.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, ProcessOptions) {
        let root = tempdir().unwrap();
        let pharmacies = root.path().join("pharmacies");
        let claims = root.path().join("claims");
        let reverts = root.path().join("reverts");
        for dir in [&pharmacies, &claims, &reverts] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(pharmacies.join("p.csv"), "chain,npi\nChainA,1\n").unwrap();

        let options = ProcessOptions {
            pharmacies: vec![pharmacies],
            claims: vec![claims],
            reverts: vec![reverts],
            out_dir: root.path().join("out"),
            json_output: false,
        };
        (root, options)
    }

    fn write_claim(dir: &Path, file: &str, id: &str) {
        fs::write(
            dir.join(file),
            format!(
                r#"{{"id":"{id}","npi":"1","ndc":"d1","price":"10","quantity":"2","timestamp":"2024-01-01T00:00:00Z"}}"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_cycles_pick_up_new_files_only() {
        let (_root, options) = setup();
        let claims_dir = options.claims[0].clone();
        let reverts_dir = options.reverts[0].clone();
        let analyzer = ClaimsAnalyzer::with_config(Config::default());
        let mut orchestrator =
            StreamOrchestrator::new(analyzer, options.clone(), LiveConfig::default()).unwrap();

        let first = orchestrator.run_cycle().unwrap();
        assert!(first.reports_written);
        assert!(options.out_dir.join("metrics_by_npi_ndc.json").exists());

        write_claim(&claims_dir, "a.json", "c1");
        let second = orchestrator.run_cycle().unwrap();
        assert_eq!(second.new_claim_files, 1);
        assert_eq!(second.claims_parsed, 1);
        assert!(second.reports_written);

        let third = orchestrator.run_cycle().unwrap();
        assert_eq!(third.new_claim_files, 0);
        assert!(!third.reports_written);

        fs::write(
            reverts_dir.join("r.json"),
            r#"[{"id":"r1","claim_id":"c1","timestamp":"2024-01-02T00:00:00Z"}]"#,
        )
        .unwrap();
        orchestrator.run_cycle().unwrap();

        let summary = orchestrator.summary();
        assert_eq!(summary.claims_stored, 1);
        assert_eq!(summary.active_claims, 0);
        assert_eq!(summary.claim_files.accepted, 1);
        assert_eq!(summary.reversal_files.accepted, 1);
    }

    #[tokio::test]
    async fn test_run_stops_after_max_cycles() {
        let (_root, options) = setup();
        write_claim(&options.claims[0], "a.json", "c1");
        let live = LiveConfig {
            poll_interval: std::time::Duration::from_millis(10),
            max_cycles: Some(2),
        };
        let analyzer = ClaimsAnalyzer::with_config(Config::default());
        let mut orchestrator = StreamOrchestrator::new(analyzer, options, live).unwrap();

        let summary = orchestrator.run().await.unwrap();
        assert_eq!(summary.claims_stored, 1);
        assert!(summary.outputs.is_some());
    }
}
