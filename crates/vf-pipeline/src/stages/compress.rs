//! Single-file HEVC compression.

use async_trait::async_trait;
use vf_core::{Config, Resolution};

use super::COMPRESSED_MP4;
use crate::artifacts::Artifacts;
use crate::context::{settle, StageContext};
use crate::stage::Stage;

/// Writes `video.mp4` at the tallest configured tier.
pub struct CompressStage;

#[async_trait]
impl Stage for CompressStage {
    fn name(&self) -> &'static str {
        "compress"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.mp4
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let tier = Resolution::max_of(&ctx.config.resolutions);
        let output = ctx.output(COMPRESSED_MP4);

        let mut progress = ctx.progress(COMPRESSED_MP4);
        let result = vf_av::compress_mp4(
            ctx.tools,
            ctx.source(),
            &output,
            tier.height(),
            ctx.duration_hint().await,
            |pct| progress.update(Some(pct)),
            Some(&ctx.cancel),
        )
        .await;
        settle(&mut progress, &result);
        result?;

        artifacts.compressed = Some(output);
        Ok(())
    }
}
