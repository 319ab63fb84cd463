//! Claims Processor Library
//!
//! Reconciles pharmacy claim events against reversal events and maintains three
//! derived views over the still-active claims: per pharmacy and drug net metrics,
//! the cheapest chains per drug, and the most commonly prescribed quantities per
//! drug.
//!
//! ## Core Features
//!
//! - **Order-independent reconciliation**: a reversal may arrive before its claim;
//!   the final state is the same either way
//! - **Idempotent ingestion**: replayed claims and reversals are counted and ignored
//! - **Exact arithmetic**: prices are fixed-point decimals, rounded half-up only
//!   at output time
//! - **Batch and streaming modes**: one-shot processing or a polling loop over
//!   directories that keeps the reports current
//!
//! ## Architecture Overview
//!
//! - [`models`] - Events, claim records, keys and output rows
//! - [`parser`] - Claim / reversal JSON parsing with per-record validation
//! - [`pharmacies`] - Pharmacy CSV loading into the NPI -> chain map
//! - [`reconciler`] - The reconciliation engine and its data-quality counters
//! - [`metrics`] - Net position aggregation per (NPI, NDC)
//! - [`quantities`] - Quantity frequency histograms per NDC
//! - [`reports`] - The three derived views
//! - [`writer`] - Atomic JSON report output
//! - [`analyzer`] - Batch pipeline orchestration
//! - [`live`] - Streaming mode
//! - [`config`] - Configuration management with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//!
//! ## Main Entry Point
//!
//! ```rust,no_run
//! use claims_processor::config::Config;
//! use claims_processor::{ClaimsAnalyzer, ProcessOptions};
//!
//! # fn example() -> anyhow::Result<()> {
//! let options = ProcessOptions {
//!     pharmacies: vec!["data/pharmacies".into()],
//!     claims: vec!["data/claims".into()],
//!     reverts: vec!["data/reverts".into()],
//!     out_dir: "out".into(),
//!     json_output: true,
//! };
//! let summary = ClaimsAnalyzer::with_config(Config::load()?).run_batch(&options)?;
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod display;
pub mod file_discovery;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod pharmacies;
pub mod quantities;
pub mod reconciler;
pub mod reports;
pub mod timestamp_parser;
pub mod writer;

// Streaming mode
pub mod live;

pub use analyzer::{ClaimsAnalyzer, ProcessOptions, RunSummary};
pub use models::*;
pub use reconciler::{Counters, ReconciliationEngine};
pub use reports::ReportSet;
