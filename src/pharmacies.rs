//! Pharmacy snapshot loading
//!
//! Reads CSV files with `chain` and `npi` header columns into an NPI -> chain map.
//! Extra columns are ignored, blank values are skipped, and when an NPI appears
//! more than once (in one file or across files) the last occurrence wins.

use crate::models::PharmacyMap;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct PharmacyRow {
    #[serde(default)]
    chain: Option<String>,
    #[serde(default)]
    npi: Option<String>,
}

/// Load every pharmacy file in order. Any unreadable file is fatal.
pub fn load_pharmacy_map(files: &[PathBuf]) -> Result<PharmacyMap> {
    let mut pharmacies = PharmacyMap::new();

    for path in files {
        let loaded = load_pharmacy_file(path, &mut pharmacies)?;
        debug!(file = %path.display(), rows = loaded, "Loaded pharmacy snapshot file");
    }

    info!(
        files = files.len(),
        pharmacies = pharmacies.len(),
        "Pharmacy map loaded"
    );
    Ok(pharmacies)
}

fn load_pharmacy_file(path: &Path, pharmacies: &mut PharmacyMap) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open pharmacy file: {}", path.display()))?;

    let mut loaded = 0;
    for (line, row) in reader.deserialize::<PharmacyRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(file = %path.display(), row = line + 1, error = %e, "Skipping malformed pharmacy row");
                continue;
            }
        };

        let chain = row.chain.unwrap_or_default();
        let npi = row.npi.unwrap_or_default();
        if chain.is_empty() || npi.is_empty() {
            continue;
        }

        pharmacies.insert(npi, chain);
        loaded += 1;
    }

    Ok(loaded)
}
