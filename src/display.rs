//! Run summary output
//!
//! Prints the outcome of a run either as coloured, human-readable text or as a
//! single JSON object for programmatic consumption. Logging goes to stderr, so
//! the JSON form on stdout stays machine-readable.

use crate::analyzer::RunSummary;
use crate::parser::ParseStats;
use colored::Colorize;

pub struct SummaryDisplay {
    json_output: bool,
}

impl SummaryDisplay {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    pub fn show(&self, summary: &RunSummary) {
        if self.json_output {
            match serde_json::to_string_pretty(summary) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to serialize summary: {}", e),
            }
            return;
        }

        print!("{}", self.render_text(summary));
    }

    pub fn render_text(&self, summary: &RunSummary) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", "Claims reconciliation complete".bold().green()));
        out.push_str(&format!("  Run:              {}\n", summary.run_id.dimmed()));
        out.push_str(&format!("  Pharmacies:       {}\n", summary.pharmacies));
        out.push_str(&Self::render_stats("Claim files", &summary.claim_files));
        out.push_str(&Self::render_stats("Reversal files", &summary.reversal_files));
        out.push_str(&format!(
            "  Claims stored:    {} ({} active)\n",
            summary.claims_stored, summary.active_claims
        ));
        out.push_str(&format!("  Pending reversals: {}\n", summary.pending_reversals));

        let counters = &summary.counters;
        let heading = if counters.total() > 0 {
            "Data quality".yellow().bold()
        } else {
            "Data quality".green().bold()
        };
        out.push_str(&format!("{}\n", heading));
        out.push_str(&format!("  Duplicate claims:        {}\n", counters.duplicate_claims));
        out.push_str(&format!("  Duplicate reversals:     {}\n", counters.duplicate_reversals));
        out.push_str(&format!("  Unknown pharmacy claims: {}\n", counters.unknown_pharmacy_claims));
        out.push_str(&format!("  Orphan reversals:        {}\n", counters.orphan_reversals));
        out.push_str(&format!("  Already reverted:        {}\n", counters.already_reverted));

        out.push_str(&format!("{}\n", "Reports".bold()));
        let rows = &summary.rows;
        match &summary.outputs {
            Some(outputs) => {
                out.push_str(&format!("  {} ({} rows)\n", outputs.metrics.display(), rows.metrics));
                out.push_str(&format!("  {} ({} rows)\n", outputs.top_chains.display(), rows.top_chains));
                out.push_str(&format!(
                    "  {} ({} rows)\n",
                    outputs.top_quantities.display(),
                    rows.top_quantities
                ));
            }
            None => out.push_str(&format!("  {}\n", "not written".dimmed())),
        }

        out
    }

    fn render_stats(label: &str, stats: &ParseStats) -> String {
        let rejected = if stats.rejected > 0 {
            stats.rejected.to_string().red().to_string()
        } else {
            stats.rejected.to_string()
        };
        format!(
            "  {:<17} {} files, {} records, {} accepted, {} rejected\n",
            format!("{}:", label),
            stats.files,
            stats.records,
            stats.accepted,
            rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::RowCounts;
    use crate::reconciler::Counters;

    fn summary() -> RunSummary {
        RunSummary {
            run_id: "run-1".to_string(),
            pharmacies: 2,
            claim_files: ParseStats {
                files: 1,
                unreadable_files: 0,
                records: 3,
                accepted: 2,
                rejected: 1,
            },
            reversal_files: ParseStats::default(),
            claims_stored: 2,
            active_claims: 1,
            pending_reversals: 0,
            counters: Counters {
                duplicate_claims: 1,
                ..Counters::default()
            },
            rows: RowCounts {
                metrics: 1,
                top_chains: 1,
                top_quantities: 1,
            },
            outputs: None,
        }
    }

    #[test]
    fn test_render_text_mentions_counters() {
        colored::control::set_override(false);
        let text = SummaryDisplay::new(false).render_text(&summary());
        assert!(text.contains("Duplicate claims:        1"));
        assert!(text.contains("Claims stored:    2 (1 active)"));
        assert!(text.contains("not written"));
    }

    #[test]
    fn test_summary_serializes() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["counters"]["duplicate_claims"], 1);
        assert_eq!(json["claim_files"]["rejected"], 1);
    }
}
