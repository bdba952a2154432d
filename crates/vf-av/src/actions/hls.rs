//! HLS rendition encoding.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use vf_core::Resolution;

use super::{ffmpeg_command, run_ffmpeg, AUDIO_BITRATE, AUDIO_CODEC};
use crate::tools::ToolRegistry;

/// Segment target duration in seconds.
const SEGMENT_SECS: u32 = 4;

/// Files produced for one resolution tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsRendition {
    pub tier: Resolution,
    /// `<tier>p` directory holding the playlist and its segments.
    pub dir: PathBuf,
    /// `<tier>p/<tier>p.m3u8`.
    pub playlist: PathBuf,
}

impl HlsRendition {
    /// Layout of the rendition for `tier` under `destination`.
    pub fn layout(destination: &Path, tier: Resolution) -> Self {
        let name = tier.name();
        let dir = destination.join(&name);
        let playlist = dir.join(format!("{name}.m3u8"));
        Self { tier, dir, playlist }
    }

    pub fn playlist_filename(&self) -> String {
        format!("{}.m3u8", self.tier.name())
    }

    /// Path of the playlist relative to the master manifest.
    pub fn path_from_manifest(&self) -> String {
        let name = self.tier.name();
        format!("{name}/{name}.m3u8")
    }
}

/// Encode `input` into an H.264 VOD rendition scaled to the tier's height.
///
/// Produces `<destination>/<tier>p/<tier>p.m3u8` plus `<tier>p_NNN.ts`
/// segments of roughly four seconds.
pub async fn transcode_hls(
    tools: &ToolRegistry,
    input: &Path,
    destination: &Path,
    tier: Resolution,
    duration_secs: Option<f64>,
    on_progress: impl FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<HlsRendition> {
    let rendition = HlsRendition::layout(destination, tier);
    tokio::fs::create_dir_all(&rendition.dir).await?;

    let segment_pattern = rendition.dir.join(format!("{}_%03d.ts", tier.name()));

    tracing::info!(
        "HLS encode: {:?} -> {:?} ({tier})",
        input,
        rendition.playlist,
    );

    let mut cmd = ffmpeg_command(tools)?;
    cmd.arg("-i").arg_path(input);
    cmd.args(["-c:v", "libx264", "-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE]);
    cmd.args(["-filter:v", &format!("scale=-2:{}", tier.height())]);
    cmd.args(["-preset", "fast", "-crf", "28"]);
    cmd.args(["-hls_time", &SEGMENT_SECS.to_string()]);
    cmd.args(["-hls_playlist_type", "vod"]);
    cmd.arg("-hls_segment_filename").arg_path(&segment_pattern);
    cmd.arg_path(&rendition.playlist);

    run_ffmpeg(&cmd, duration_secs, on_progress, cancel).await?;
    Ok(rendition)
}
