//! Master manifest assembly.

use async_trait::async_trait;
use vf_core::Config;

use crate::artifacts::Artifacts;
use crate::context::StageContext;
use crate::stage::Stage;

/// Writes `main.m3u8` from the renditions the transcode stage produced.
pub struct ManifestStage;

#[async_trait]
impl Stage for ManifestStage {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.transcode && !config.resolutions.is_empty()
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        artifacts.manifest =
            vf_media::write_master_manifest(&ctx.destination, &artifacts.playlists).await?;
        if let Some(path) = &artifacts.manifest {
            tracing::info!(
                "Manifest {:?} lists {} renditions",
                path,
                artifacts.playlists.len()
            );
        }
        Ok(())
    }
}
