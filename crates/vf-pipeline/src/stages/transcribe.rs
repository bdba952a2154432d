//! Speech-to-text on the extracted audio.

use async_trait::async_trait;
use vf_core::config::TranscriptionEngine;
use vf_core::Config;
use vf_media::ReplacementTable;

use crate::artifacts::Artifacts;
use crate::context::{settle, StageContext};
use crate::stage::Stage;

/// Produces the canonical `<language>.srt` (and a plain-text transcript when
/// the engine writes one), then applies the vocabulary corrections.
pub struct TranscribeStage;

#[async_trait]
impl Stage for TranscribeStage {
    fn name(&self) -> &'static str {
        "transcribe"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.transcribe
    }

    fn requires(&self, artifacts: &Artifacts) -> Option<&'static str> {
        artifacts
            .audio
            .is_none()
            .then_some("no audio file was generated")
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let settings = &ctx.config.transcription;
        let audio = artifacts
            .audio
            .clone()
            .ok_or_else(|| vf_core::Error::argument("no audio to transcribe"))?;

        let transcript = match settings.engine {
            TranscriptionEngine::Whisper => {
                let mut progress = ctx.progress(&format!("{}.srt", settings.language));
                let result = vf_av::transcribe_whisper(
                    ctx.tools,
                    &audio,
                    &ctx.destination,
                    &settings.model,
                    &settings.language,
                    |pct| progress.update(Some(pct)),
                    Some(&ctx.cancel),
                )
                .await;
                settle(&mut progress, &result);
                result?
            }
            TranscriptionEngine::FasterWhisper => {
                let script = settings.faster_whisper_script.as_deref().ok_or_else(|| {
                    vf_core::Error::argument("transcription.faster_whisper_script is not set")
                })?;
                if settings.language != vf_av::FASTER_WHISPER_LANGUAGE {
                    tracing::warn!(
                        "faster-whisper transcribes into {}; ignoring language {:?}",
                        vf_av::FASTER_WHISPER_LANGUAGE,
                        settings.language
                    );
                }
                let mut progress =
                    ctx.progress(&format!("{}.srt", vf_av::FASTER_WHISPER_LANGUAGE));
                let result = vf_av::transcribe_faster_whisper(
                    ctx.tools,
                    script,
                    &audio,
                    &ctx.destination,
                    &settings.model,
                    Some(&ctx.cancel),
                )
                .await;
                settle(&mut progress, &result);
                result?
            }
        };

        let table = ReplacementTable::compile(&settings.replacements);
        for path in std::iter::once(&transcript.srt).chain(transcript.text.as_ref()) {
            if let Err(e) = table.apply_to_file(path).await {
                tracing::error!("Failed to apply replacements to {:?}: {e}", path);
            }
        }

        tracing::info!("Transcribed {} into {:?}", ctx.file.filename, transcript.srt);
        artifacts.transcription = Some(transcript.srt);
        artifacts.transcript_text = transcript.text;
        Ok(())
    }
}
