//! HLS master manifest generation.
//!
//! Each completed resolution transcode yields one [`StagePlaylist`]; once
//! every tier of a file has been encoded they are folded, in processing
//! order, into `main.m3u8` next to the tier directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vf_core::Resolution;

/// File name of the master manifest inside a destination directory.
pub const MASTER_MANIFEST: &str = "main.m3u8";

/// One per-resolution sub-playlist, as referenced from the master manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlaylist {
    pub resolution_width: u32,
    pub resolution_height: u32,
    pub bitrate_kbps: u32,
    /// e.g. `720p.m3u8`.
    pub playlist_filename: String,
    /// e.g. `720p/720p.m3u8`.
    pub relative_path_from_manifest: String,
    pub absolute_path: PathBuf,
}

impl StagePlaylist {
    /// Playlist entry for `tier` under `destination`, using the table's
    /// nominal dimensions.
    pub fn for_tier(destination: &Path, tier: Resolution) -> Self {
        let name = tier.name();
        let playlist_filename = format!("{name}.m3u8");
        let relative = format!("{name}/{playlist_filename}");
        Self {
            resolution_width: tier.width(),
            resolution_height: tier.height(),
            bitrate_kbps: tier.bitrate_kbps(),
            absolute_path: destination.join(&name).join(&playlist_filename),
            playlist_filename,
            relative_path_from_manifest: relative,
        }
    }

    /// Replace the nominal dimensions with measured ones.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.resolution_width = width;
        self.resolution_height = height;
        self
    }

    /// Advertised bandwidth in bits per second.
    pub fn bandwidth(&self) -> u64 {
        u64::from(self.bitrate_kbps) * 1000
    }
}

/// Render the master manifest for `playlists`.
///
/// Returns `None` for an empty list. Otherwise the text has exactly
/// `2 * playlists.len() + 2` lines and no trailing newline.
pub fn generate_master_manifest(playlists: &[StagePlaylist]) -> Option<String> {
    if playlists.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(playlists.len() * 2 + 2);
    lines.push("#EXTM3U".to_string());
    lines.push("#EXT-X-VERSION:3".to_string());
    for playlist in playlists {
        lines.push(format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}",
            playlist.bandwidth(),
            playlist.resolution_width,
            playlist.resolution_height
        ));
        lines.push(playlist.relative_path_from_manifest.clone());
    }
    Some(lines.join("\n"))
}

/// Write `main.m3u8` into `destination`.
///
/// An empty list writes nothing and returns `Ok(None)`.
pub async fn write_master_manifest(
    destination: &Path,
    playlists: &[StagePlaylist],
) -> vf_core::Result<Option<PathBuf>> {
    let Some(text) = generate_master_manifest(playlists) else {
        tracing::info!("No playlists were generated for {:?}; skipping manifest", destination);
        return Ok(None);
    };

    let path = destination.join(MASTER_MANIFEST);
    tokio::fs::write(&path, text).await?;
    tracing::debug!("Wrote master manifest {:?}", path);
    Ok(Some(path))
}
