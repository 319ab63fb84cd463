//! Directory watcher for streaming mode
//!
//! Remembers every event file it has handed out, so each file is processed once
//! per process lifetime even if it is still present on later scans.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::file_discovery::discover_files;
use crate::live::NewFiles;

/// Tracks newly appeared JSON files directly inside the claim and reversal directories
pub struct FileStreamWatcher {
    claim_dirs: Vec<PathBuf>,
    reversal_dirs: Vec<PathBuf>,
    seen_claim_files: HashSet<PathBuf>,
    seen_reversal_files: HashSet<PathBuf>,
}

impl FileStreamWatcher {
    pub fn new(claim_dirs: &[PathBuf], reversal_dirs: &[PathBuf]) -> Self {
        Self {
            claim_dirs: claim_dirs.to_vec(),
            reversal_dirs: reversal_dirs.to_vec(),
            seen_claim_files: HashSet::new(),
            seen_reversal_files: HashSet::new(),
        }
    }

    /// Scan all directories and return files not returned by an earlier call.
    ///
    /// A file reachable from both a claim and a reversal directory is treated as
    /// a claim file. Directories that do not exist yet are simply empty.
    pub fn discover_new_files(&mut self) -> NewFiles {
        let mut new_files = NewFiles::default();

        for file in Self::scan(&self.claim_dirs) {
            if self.seen_claim_files.insert(file.clone()) {
                new_files.claims.push(file);
            }
        }

        for file in Self::scan(&self.reversal_dirs) {
            if self.seen_claim_files.contains(&file) {
                continue;
            }
            if self.seen_reversal_files.insert(file.clone()) {
                new_files.reversals.push(file);
            }
        }

        if !new_files.is_empty() {
            debug!(
                claims = new_files.claims.len(),
                reversals = new_files.reversals.len(),
                "Discovered new event files"
            );
        }
        new_files
    }

    pub fn seen_files(&self) -> usize {
        self.seen_claim_files.len() + self.seen_reversal_files.len()
    }

    fn scan(dirs: &[PathBuf]) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = discover_files(dirs, false)
            .json_files
            .iter()
            .map(|path| resolve(path))
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
