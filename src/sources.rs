//! Input discovery for runs started without explicit sources.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Extensions picked up from a source directory. Queue construction still
/// rejects the ones the pipeline cannot process.
pub const DISCOVERED_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "webm", "avi"];

/// List the video files directly inside `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list source directory {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let wanted = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| DISCOVERED_EXTENSIONS.contains(&e.as_str()));
        if wanted {
            found.push(path.to_path_buf());
        } else {
            tracing::debug!("Ignoring {:?}", path);
        }
    }

    found.sort();
    tracing::info!("Found {} videos in {:?}", found.len(), dir);
    Ok(found)
}
