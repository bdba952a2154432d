//! Audio track extraction.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::{ffmpeg_command, run_ffmpeg, AUDIO_BITRATE, AUDIO_CODEC};
use crate::tools::ToolRegistry;

/// Extract the audio of `input` into an AAC-only MP4.
pub async fn extract_audio(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    duration_secs: Option<f64>,
    on_progress: impl FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<()> {
    tracing::info!("Extract audio: {:?} -> {:?}", input, output);

    let mut cmd = ffmpeg_command(tools)?;
    cmd.arg("-i").arg_path(input);
    cmd.args(["-vn", "-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE]);
    cmd.arg_path(output);

    run_ffmpeg(&cmd, duration_secs, on_progress, cancel).await
}
