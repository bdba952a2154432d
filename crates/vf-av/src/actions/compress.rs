//! Single-file HEVC compression.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::{ffmpeg_command, run_ffmpeg, AUDIO_BITRATE, AUDIO_CODEC};
use crate::tools::ToolRegistry;

/// Compress `input` to an HEVC Main10 MP4 scaled to `height`, tagged `hvc1`
/// so Apple players accept it.
pub async fn compress_mp4(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    height: u32,
    duration_secs: Option<f64>,
    on_progress: impl FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<()> {
    tracing::info!("Compress: {:?} -> {:?} ({height}p)", input, output);

    let mut cmd = ffmpeg_command(tools)?;
    cmd.arg("-i").arg_path(input);
    cmd.args(["-c:v", "libx265", "-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE]);
    cmd.args(["-filter:v", &format!("scale=-2:{height}")]);
    cmd.args(["-preset", "fast", "-crf", "26"]);
    cmd.args(["-tag:v", "hvc1", "-x265-params", "profile=main10"]);
    cmd.arg_path(output);

    run_ffmpeg(&cmd, duration_secs, on_progress, cancel).await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::actions::testutil::{fake_tool, FFMPEG_RECORDING};

    #[tokio::test]
    async fn compress_uses_hevc_main10() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let ffmpeg = fake_tool(bin.path(), "ffmpeg", FFMPEG_RECORDING);
        let tools = ToolRegistry::from_paths([("ffmpeg", ffmpeg)]);
        let output = out.path().join("video.mp4");

        compress_mp4(&tools, Path::new("/in/a.mkv"), &output, 720, None, |_| {}, None)
            .await
            .unwrap();

        assert!(output.exists());
        let args = std::fs::read_to_string(bin.path().join("args.txt")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx265"]));
        assert!(args.windows(2).any(|w| w == ["-filter:v", "scale=-2:720"]));
        assert!(args.windows(2).any(|w| w == ["-tag:v", "hvc1"]));
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_tool_error() {
        let tools = ToolRegistry::default();
        let err = compress_mp4(&tools, Path::new("a"), Path::new("b"), 720, None, |_| {}, None)
            .await
            .unwrap_err();
        assert!(matches!(err, vf_core::Error::Tool { .. }));
    }
}
