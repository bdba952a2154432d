//! Storyboard sprite and thumbnail cues.

use async_trait::async_trait;
use vf_core::Config;
use vf_media::{StoryboardGrid, STORYBOARD_JPG};

use crate::artifacts::Artifacts;
use crate::context::{settle, StageContext};
use crate::stage::Stage;

/// Writes `storyboard.jpg` and `thumbnails.vtt`.
pub struct StoryboardStage;

#[async_trait]
impl Stage for StoryboardStage {
    fn name(&self) -> &'static str {
        "storyboard"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.storyboard && config.storyboard.interval_secs > 0
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let settings = &ctx.config.storyboard;
        let duration = ctx.duration().await?;
        let grid = StoryboardGrid::new(
            duration,
            settings.interval_secs,
            settings.tile_width,
            settings.tile_height,
        )
        .ok_or_else(|| vf_core::Error::argument(format!("no storyboard for duration {duration}")))?;

        let sprite = ctx.output(STORYBOARD_JPG);
        let mut progress = ctx.progress(STORYBOARD_JPG);
        let result = vf_av::storyboard_sprite(
            ctx.tools,
            ctx.source(),
            &sprite,
            grid.interval_secs,
            (grid.tile_width, grid.tile_height),
            (grid.columns, grid.rows),
            Some(duration),
            |pct| progress.update(Some(pct)),
            Some(&ctx.cancel),
        )
        .await;
        settle(&mut progress, &result);
        result?;

        artifacts.storyboard = Some(sprite);
        artifacts.thumbnails = Some(grid.write_vtt(&ctx.destination).await?);
        Ok(())
    }
}
