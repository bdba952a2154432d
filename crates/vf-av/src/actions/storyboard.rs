//! Storyboard sprite generation.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::{ffmpeg_command, run_ffmpeg};
use crate::tools::ToolRegistry;

/// Sample one keyframe every `interval_secs`, scale each to a tile and pack
/// them into a single `columns x rows` JPEG.
#[allow(clippy::too_many_arguments)]
pub async fn storyboard_sprite(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    interval_secs: u32,
    tile: (u32, u32),
    grid: (u32, u32),
    duration_secs: Option<f64>,
    on_progress: impl FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<()> {
    if interval_secs == 0 {
        return Err(vf_core::Error::argument("storyboard interval must be positive"));
    }
    let (tile_w, tile_h) = tile;
    let (columns, rows) = grid;
    tracing::info!("Storyboard: {:?} -> {:?} ({columns}x{rows})", input, output);

    let filters = format!(
        "fps=1/{interval_secs},scale={tile_w}:{tile_h}:flags=lanczos,tile={columns}x{rows}"
    );

    let mut cmd = ffmpeg_command(tools)?;
    cmd.args(["-skip_frame", "nokey"]);
    cmd.arg("-i").arg_path(input);
    cmd.args(["-vf", &filters]);
    cmd.args(["-frames:v", "1", "-q:v", "5"]);
    cmd.arg_path(output);

    run_ffmpeg(&cmd, duration_secs, on_progress, cancel).await
}
