use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use claims_processor::analyzer::{ClaimsAnalyzer, ProcessOptions, RunSummary};
use claims_processor::config::Config;
use claims_processor::display::SummaryDisplay;
use claims_processor::live::orchestrator::StreamOrchestrator;
use claims_processor::live::LiveConfig;
use claims_processor::logging::init_logging;

#[derive(Parser)]
#[command(name = "claims-processor")]
#[command(about = "Reconcile pharmacy claim and reversal events into per-drug reports")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every input file once and write the reports
    Batch {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Poll the claim and reversal directories and keep the reports current
    Stream {
        #[command(flatten)]
        input: InputArgs,
        /// Seconds between directory scans
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after N polling cycles
        #[arg(long)]
        max_cycles: Option<u64>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Pharmacy CSV files or directories
    #[arg(long, num_args = 1.., required = true)]
    pharmacies: Vec<PathBuf>,
    /// Claim JSON files or directories
    #[arg(long, num_args = 1.., required = true)]
    claims: Vec<PathBuf>,
    /// Reversal JSON files or directories
    #[arg(long, num_args = 1.., required = true)]
    reverts: Vec<PathBuf>,
    /// Directory the reports are written to
    #[arg(long, default_value = "out")]
    out: PathBuf,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl InputArgs {
    fn into_options(self) -> ProcessOptions {
        ProcessOptions {
            pharmacies: self.pharmacies,
            claims: self.claims,
            reverts: self.reverts,
            out_dir: self.out,
            json_output: self.json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let json = match &cli.command {
        Commands::Batch { input } | Commands::Stream { input, .. } => input.json,
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => return handle_error(e, json),
    };

    match cli.command {
        Commands::Batch { input } => {
            let _guard = init_logging(&config);

            let options = input.into_options();
            match ClaimsAnalyzer::with_config(config).run_batch(&options) {
                Ok(summary) => report(&summary, json),
                Err(e) => handle_error(e, json),
            }
        }
        Commands::Stream {
            input,
            interval,
            max_cycles,
        } => {
            let mut config = config;
            if let Err(e) = apply_stream_overrides(&mut config, interval, max_cycles) {
                return handle_error(e, json);
            }
            let _guard = init_logging(&config);

            let live = LiveConfig::from(&config.streaming);
            let options = input.into_options();
            let result = match StreamOrchestrator::new(ClaimsAnalyzer::with_config(config), options, live) {
                Ok(mut orchestrator) => orchestrator.run().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(summary) => report(&summary, json),
                Err(e) => handle_error(e, json),
            }
        }
    }
}

fn apply_stream_overrides(config: &mut Config, interval: Option<u64>, max_cycles: Option<u64>) -> Result<()> {
    if let Some(secs) = interval {
        if secs == 0 {
            bail!("--interval must be at least 1 second");
        }
        config.streaming.poll_interval_secs = secs;
    }
    if max_cycles.is_some() {
        config.streaming.max_cycles = max_cycles;
    }
    Ok(())
}

fn report(summary: &RunSummary, json: bool) -> Result<()> {
    SummaryDisplay::new(json).show(summary);
    Ok(())
}

fn handle_error(e: anyhow::Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
