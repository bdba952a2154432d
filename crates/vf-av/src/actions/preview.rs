//! Animated WebP preview.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::{ffmpeg_command, run_ffmpeg};
use crate::tools::ToolRegistry;

/// Length of the preview clip in seconds.
pub const PREVIEW_LENGTH_SECS: f64 = 6.0;

/// Start offset of the preview: ten seconds in for anything longer than
/// thirty seconds, otherwise the very beginning.
pub fn preview_window(duration_secs: f64) -> f64 {
    if duration_secs > 30.0 {
        10.0
    } else {
        0.0
    }
}

/// Render a looping, silent 320px-wide WebP of `PREVIEW_LENGTH_SECS`
/// starting at `start_secs`.
pub async fn animated_preview(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    start_secs: f64,
    on_progress: impl FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<()> {
    tracing::info!("Preview: {:?} -> {:?} (start={start_secs}s)", input, output);

    let mut cmd = ffmpeg_command(tools)?;
    cmd.args(["-ss", &start_secs.to_string()]);
    cmd.arg("-i").arg_path(input);
    cmd.args(["-t", &PREVIEW_LENGTH_SECS.to_string()]);
    cmd.args(["-c:v", "libwebp", "-vf", "fps=30,scale=320:-1"]);
    cmd.args(["-preset", "picture", "-loop", "0", "-an"]);
    cmd.arg_path(output);

    run_ffmpeg(&cmd, Some(PREVIEW_LENGTH_SECS), on_progress, cancel).await
}
