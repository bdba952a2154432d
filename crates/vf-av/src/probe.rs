//! ffprobe-backed media probing.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and keeps only what the pipeline needs: the video duration (for preview
//! windows, storyboard grids and progress percentages), the first video
//! stream's dimensions and whether an audio stream exists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// The probed facts about one media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaProbe {
    /// Video duration in seconds.
    pub duration_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_audio: bool,
}

impl MediaProbe {
    /// Video dimensions, when both are known and non-zero.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Create a prober that finds ffprobe on `PATH`.
    pub fn from_path() -> Option<Self> {
        which::which("ffprobe").ok().map(Self::new)
    }

    /// Probe `path`.
    ///
    /// # Errors
    ///
    /// [`vf_core::Error::Tool`] when ffprobe fails, [`vf_core::Error::Probe`]
    /// when its output cannot be decoded.
    pub async fn probe(&self, path: &Path) -> vf_core::Result<MediaProbe> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ]);
        cmd.arg_path(path);

        let output = cmd.execute().await?;
        parse_ffprobe_json(&output.stdout)
    }

    /// Probe and return the video duration.
    ///
    /// # Errors
    ///
    /// [`vf_core::Error::Probe`] when no duration can be found.
    pub async fn duration(&self, path: &Path) -> vf_core::Result<f64> {
        self.probe(path)
            .await?
            .duration_secs
            .ok_or_else(|| vf_core::Error::Probe(format!("could not detect duration of {path:?}")))
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Decode ffprobe's JSON. The video stream's own duration wins; containers
/// that only carry a format-level duration (Matroska) fall back to it.
pub fn parse_ffprobe_json(json: &str) -> vf_core::Result<MediaProbe> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| vf_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let duration_secs = video
        .and_then(|v| parse_seconds(v.duration.as_deref()))
        .or_else(|| parse_seconds(output.format.duration.as_deref()));

    Ok(MediaProbe {
        duration_secs,
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        has_audio: output
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}
