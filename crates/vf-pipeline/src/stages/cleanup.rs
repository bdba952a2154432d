//! Removal of the intermediate audio track.

use async_trait::async_trait;
use vf_core::Config;

use crate::artifacts::Artifacts;
use crate::context::StageContext;
use crate::stage::Stage;

/// Deletes `audio.mp4` once the transcription branch is over, but only when
/// this run's extraction created it.
pub struct CleanupStage;

#[async_trait]
impl Stage for CleanupStage {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.transcribe
    }

    fn finalizer(&self) -> bool {
        true
    }

    async fn run(&self, _ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let audio = match (&artifacts.audio, artifacts.audio_created) {
            (Some(audio), true) => audio.clone(),
            _ => {
                tracing::info!("Skipping audio removal, extraction did not produce a file");
                return Ok(());
            }
        };

        tracing::info!("Deleting: {:?}", audio);
        match tokio::fs::remove_file(&audio).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        artifacts.audio_created = false;
        Ok(())
    }
}
