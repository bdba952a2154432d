//! Subtitle translation, one target language at a time but all at once.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::join_all;
use vf_core::config::TranslationMode;
use vf_core::Config;
use vf_media::srt;

use crate::artifacts::Artifacts;
use crate::context::{settle, StageContext};
use crate::stage::Stage;

/// Writes `<code>.srt` for every configured target language.
///
/// Languages run concurrently and fail independently; the stage fails only
/// when every language failed. A code whose output would overwrite the
/// source subtitle is skipped.
pub struct TranslateStage;

#[async_trait]
impl Stage for TranslateStage {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.transcribe && !config.transcription.translate_to.is_empty()
    }

    fn requires(&self, artifacts: &Artifacts) -> Option<&'static str> {
        artifacts
            .transcription
            .is_none()
            .then_some("no transcription file was generated")
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let source = artifacts
            .transcription
            .clone()
            .ok_or_else(|| vf_core::Error::argument("no subtitle to translate"))?;

        let codes: Vec<&str> = ctx
            .config
            .transcription
            .translate_to
            .iter()
            .map(|c| c.trim())
            .filter(|c| {
                if c.is_empty() {
                    tracing::warn!("Skipping empty translation language code");
                    return false;
                }
                if ctx.output(&format!("{c}.srt")) == source {
                    tracing::warn!("Skipping translation to {c}: it is the transcription language");
                    return false;
                }
                true
            })
            .collect();

        let results = join_all(codes.iter().map(|code| translate_one(ctx, code, &source))).await;

        let mut failed = 0usize;
        for (code, result) in codes.iter().zip(results) {
            match result {
                Ok(path) => {
                    tracing::info!("Completed translation to {code} for {:?}", source);
                    artifacts.translations.push((code.to_string(), path));
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        file = %ctx.file.filename,
                        stage = "translate",
                        "Translation error: {code}: {e}"
                    );
                }
            }
        }

        if failed > 0 && artifacts.translations.is_empty() {
            return Err(vf_core::Error::pipeline(
                "translate",
                format!("all {failed} translations failed"),
            ));
        }
        Ok(())
    }
}

async fn translate_one(ctx: &StageContext<'_>, code: &str, source: &Path) -> vf_core::Result<PathBuf> {
    let label = format!("{code}.srt");
    let output = ctx.output(&label);
    let mut progress = ctx.progress(&label);

    let result = match ctx.config.transcription.translation_mode {
        TranslationMode::File => {
            vf_av::translate_file(ctx.tools, code, source, &output, Some(&ctx.cancel)).await
        }
        TranslationMode::Captions => translate_captions(ctx, code, source, &output).await,
    };
    settle(&mut progress, &result);
    result.map(|()| output)
}

/// Translate caption text only, one caption per line, and re-merge it into
/// the original timings.
async fn translate_captions(
    ctx: &StageContext<'_>,
    code: &str,
    source: &Path,
    output: &Path,
) -> vf_core::Result<()> {
    let captions = srt::parse(&tokio::fs::read_to_string(source).await?)?;
    let text = captions
        .iter()
        .map(|c| c.single_line())
        .collect::<Vec<_>>()
        .join("\n");

    let translated = vf_av::translate_text(ctx.tools, code, &text, Some(&ctx.cancel)).await?;
    let lines: Vec<String> = translated.lines().map(str::to_string).collect();
    let merged = srt::merge_translated(&captions, &lines);

    tokio::fs::write(output, srt::write(&merged)).await?;
    Ok(())
}
