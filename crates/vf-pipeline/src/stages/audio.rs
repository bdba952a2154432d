//! Audio extraction for transcription.

use async_trait::async_trait;
use vf_core::Config;

use super::AUDIO_MP4;
use crate::artifacts::Artifacts;
use crate::context::{settle, StageContext};
use crate::stage::Stage;

/// Extracts `audio.mp4`, preferring the compressed MP4 as input.
pub struct AudioStage;

#[async_trait]
impl Stage for AudioStage {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.transcribe
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let input = artifacts
            .compressed
            .clone()
            .unwrap_or_else(|| ctx.source().to_path_buf());
        let output = ctx.output(AUDIO_MP4);

        let mut progress = ctx.progress(AUDIO_MP4);
        let result = vf_av::extract_audio(
            ctx.tools,
            &input,
            &output,
            ctx.duration_hint().await,
            |pct| progress.update(Some(pct)),
            Some(&ctx.cancel),
        )
        .await;
        settle(&mut progress, &result);
        result?;

        artifacts.audio = Some(output);
        artifacts.audio_created = true;
        Ok(())
    }
}
