//! Segment file discovery.
//!
//! A scan's segment files share a per-band name prefix (satellite, scan
//! time, band, area); everything matching a prefix under the data
//! directory belongs to that band's scan.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Find every segment file under `dir` whose name starts with `prefix`,
/// sorted by name so segments open in sequence order.
pub fn segment_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.with_context(|| format!("reading directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with(prefix)
        {
            matches.push(entry.into_path());
        }
    }
    matches.sort();
    Ok(matches)
}
