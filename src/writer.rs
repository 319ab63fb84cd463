//! Report persistence
//!
//! Each report is serialized to `<name>.tmp` next to its destination and then
//! renamed over it, so readers never observe a half-written file.

use crate::config::OutputConfig;
use crate::reports::ReportSet;
use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, data: &T, pretty: bool) -> Result<()> {
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    {
        let file = File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        let serialized = if pretty {
            serde_json::to_writer_pretty(&mut writer, data)
        } else {
            serde_json::to_writer(&mut writer, data)
        };
        serialized.with_context(|| format!("Failed to serialize {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    debug!(path = %path.display(), "Report written");
    Ok(())
}

/// Paths of the three report files after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenReports {
    pub metrics: PathBuf,
    pub top_chains: PathBuf,
    pub top_quantities: PathBuf,
}

/// Write all three views into `out_dir`, creating the directory if needed.
pub fn write_reports(out_dir: &Path, reports: &ReportSet, output: &OutputConfig) -> Result<WrittenReports> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let written = WrittenReports {
        metrics: out_dir.join(&output.metrics_file),
        top_chains: out_dir.join(&output.top_chains_file),
        top_quantities: out_dir.join(&output.top_quantities_file),
    };

    write_json_atomic(&written.metrics, &reports.metrics, output.json_pretty)?;
    write_json_atomic(&written.top_chains, &reports.top_chains, output.json_pretty)?;
    write_json_atomic(&written.top_quantities, &reports.top_quantities, output.json_pretty)?;

    Ok(written)
}
