//! Input file discovery: expands files and directories into sorted JSON and CSV lists.

use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Input files found under a set of directories, split by kind and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFiles {
    pub json_files: Vec<PathBuf>,
    pub csv_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Json,
    Csv,
}

fn classify(path: &Path) -> Option<InputKind> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "json" => Some(InputKind::Json),
        "csv" => Some(InputKind::Csv),
        _ => None,
    }
}

/// Find `.json` and `.csv` files under the given paths.
///
/// Paths that do not exist are skipped. A path naming a file is classified by its
/// extension; a directory is searched (recursively when `recursive` is set).
pub fn discover_files<P: AsRef<Path>>(paths: &[P], recursive: bool) -> DiscoveredFiles {
    let mut discovered = DiscoveredFiles::default();

    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "Skipping missing input path");
            continue;
        }

        if path.is_file() {
            push_classified(&mut discovered, path.to_path_buf());
            continue;
        }

        let escaped = Pattern::escape(&path.to_string_lossy());
        let pattern = if recursive {
            format!("{}/**/*", escaped)
        } else {
            format!("{}/*", escaped)
        };

        if let Ok(entries) = glob(&pattern) {
            for entry in entries.flatten() {
                if entry.is_file() {
                    push_classified(&mut discovered, entry);
                }
            }
        }
    }

    discovered.json_files.sort();
    discovered.json_files.dedup();
    discovered.csv_files.sort();
    discovered.csv_files.dedup();
    discovered
}

fn push_classified(discovered: &mut DiscoveredFiles, path: PathBuf) {
    match classify(&path) {
        Some(InputKind::Json) => discovered.json_files.push(path),
        Some(InputKind::Csv) => discovered.csv_files.push(path),
        None => {}
    }
}
