//! Animated WebP preview.

use async_trait::async_trait;
use vf_core::Config;

use super::PREVIEW_WEBP;
use crate::artifacts::Artifacts;
use crate::context::{settle, StageContext};
use crate::stage::Stage;

/// Writes a six second looping `video.webp`.
pub struct PreviewStage;

#[async_trait]
impl Stage for PreviewStage {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.webp
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let duration = ctx.duration().await?;
        let start = vf_av::preview_window(duration);
        let output = ctx.output(PREVIEW_WEBP);

        let mut progress = ctx.progress(PREVIEW_WEBP);
        let result = vf_av::animated_preview(
            ctx.tools,
            ctx.source(),
            &output,
            start,
            |pct| progress.update(Some(pct)),
            Some(&ctx.cancel),
        )
        .await;
        settle(&mut progress, &result);
        result?;

        artifacts.preview = Some(output);
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::stages::testutil::{Bench, FFMPEG, FFPROBE};

    #[tokio::test]
    async fn writes_webp() {
        let bench = Bench::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
        let mut artifacts = Artifacts::default();
        PreviewStage.run(&bench.ctx(), &mut artifacts).await.unwrap();
        assert!(bench.destination().join("video.webp").exists());
        assert!(artifacts.preview.is_some());
    }

    #[tokio::test]
    async fn needs_a_duration() {
        let bench = Bench::new(&[("ffmpeg", FFMPEG), ("ffprobe", "exit 1")]);
        let mut artifacts = Artifacts::default();
        let err = PreviewStage.run(&bench.ctx(), &mut artifacts).await.unwrap_err();
        assert!(matches!(err, vf_core::Error::Probe(_)));
        assert!(artifacts.preview.is_none());
    }
}
