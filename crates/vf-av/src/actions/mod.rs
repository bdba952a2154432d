//! Media processing actions: HLS renditions, MP4 compression, animated
//! previews, audio extraction, storyboard sprites, transcription and
//! translation.
//!
//! Every action builds one external invocation, streams its progress as a
//! percentage through `on_progress`, and honours an optional cancellation
//! token.

mod audio;
mod compress;
mod hls;
mod preview;
mod storyboard;
mod transcribe;
mod translate;

pub use audio::extract_audio;
pub use compress::compress_mp4;
pub use hls::{transcode_hls, HlsRendition};
pub use preview::{animated_preview, preview_window, PREVIEW_LENGTH_SECS};
pub use storyboard::storyboard_sprite;
pub use transcribe::{
    transcribe_faster_whisper, transcribe_whisper, Transcript, FASTER_WHISPER_LANGUAGE,
};
pub use translate::{translate_file, translate_text};

use tokio_util::sync::CancellationToken;

use crate::command::{StreamKind, ToolCommand};
use crate::progress::FfmpegProgress;
use crate::tools::ToolRegistry;

/// Audio settings shared by every encode.
pub(crate) const AUDIO_CODEC: &str = "aac";
pub(crate) const AUDIO_BITRATE: &str = "148k";

/// An ffmpeg command with the flags every action shares: overwrite, quiet
/// logging (errors only, so failures carry a readable stderr) and
/// machine-readable progress on stdout.
pub(crate) fn ffmpeg_command(tools: &ToolRegistry) -> vf_core::Result<ToolCommand> {
    let ffmpeg = tools.require("ffmpeg")?;
    let mut cmd = ffmpeg.command();
    cmd.args([
        "-hide_banner",
        "-nostdin",
        "-y",
        "-loglevel",
        "error",
        "-progress",
        "pipe:1",
        "-nostats",
    ]);
    cmd.stream_only();
    Ok(cmd)
}

/// Run a prepared ffmpeg command, converting `-progress` blocks into
/// percentages of `duration_secs`.
pub(crate) async fn run_ffmpeg(
    cmd: &ToolCommand,
    duration_secs: Option<f64>,
    mut on_progress: impl FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<()> {
    let mut tracker = FfmpegProgress::new(duration_secs);
    cmd.execute_streaming(
        |kind, line| match kind {
            StreamKind::Stdout => {
                if let Some(pct) = tracker.feed(line) {
                    on_progress(pct);
                }
            }
            StreamKind::Stderr => tracing::debug!(tool = "ffmpeg", "{line}"),
        },
        cancel,
    )
    .await?;
    Ok(())
}
