//! Multi-resolution HLS transcode.

use async_trait::async_trait;
use vf_core::{Config, Resolution};
use vf_media::StagePlaylist;

use crate::artifacts::Artifacts;
use crate::context::{settle, StageContext};
use crate::stage::Stage;

/// Encodes one HLS rendition per configured tier.
///
/// Unknown tiers are skipped with a warning and a failed tier does not stop
/// the others. The stage fails only when no rendition was produced.
pub struct TranscodeStage;

#[async_trait]
impl Stage for TranscodeStage {
    fn name(&self) -> &'static str {
        "transcode"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.stages.transcode && !config.resolutions.is_empty()
    }

    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
        let duration = ctx.duration_hint().await;
        let mut attempted = 0usize;

        for &height in &ctx.config.resolutions {
            let tier = match Resolution::from_tier(height) {
                Ok(tier) => tier,
                Err(e) => {
                    tracing::warn!(file = %ctx.file.filename, "{e}; skipping");
                    continue;
                }
            };
            let playlist = StagePlaylist::for_tier(&ctx.destination, tier);
            if artifacts
                .playlists
                .iter()
                .any(|p| p.playlist_filename == playlist.playlist_filename)
            {
                tracing::warn!("Resolution {tier} listed twice; encoding it once");
                continue;
            }
            if ctx.cancel.is_cancelled() {
                return Err(vf_core::Error::Cancelled("transcode".into()));
            }
            attempted += 1;

            let mut progress = ctx.progress(&playlist.playlist_filename);
            let result = vf_av::transcode_hls(
                ctx.tools,
                ctx.source(),
                &ctx.destination,
                tier,
                duration,
                |pct| progress.update(Some(pct)),
                Some(&ctx.cancel),
            )
            .await;
            settle(&mut progress, &result);

            match result {
                Ok(rendition) => {
                    let playlist = measure(ctx, playlist, &rendition.playlist).await;
                    artifacts.playlists.push(playlist);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::error!(file = %ctx.file.filename, stage = "transcode", "{tier}: {e}");
                }
            }
        }

        if artifacts.playlists.is_empty() {
            return Err(vf_core::Error::pipeline(
                "transcode",
                format!("no renditions produced ({attempted} attempted)"),
            ));
        }
        Ok(())
    }
}

/// Replace the table dimensions with the encoded ones when ffprobe can read
/// the rendition.
async fn measure(
    ctx: &StageContext<'_>,
    playlist: StagePlaylist,
    path: &std::path::Path,
) -> StagePlaylist {
    let Some(prober) = ctx.prober() else {
        return playlist;
    };
    match prober.probe(path).await.map(|p| p.dimensions()) {
        Ok(Some((width, height))) => playlist.with_dimensions(width, height),
        Ok(None) => {
            tracing::warn!("No video dimensions in {:?}; using nominal size", path);
            playlist
        }
        Err(e) => {
            tracing::warn!("Could not probe {:?}: {e}; using nominal size", path);
            playlist
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::stages::testutil::{Bench, FFMPEG, FFPROBE};
    use vf_wire::{LogEvent, ProgressStatus};

    #[tokio::test]
    async fn encodes_each_known_tier_in_order() {
        let mut bench = Bench::new(&[("ffmpeg", FFMPEG), ("ffprobe", FFPROBE)]);
        bench.config.resolutions = vec![1080, 999, 720];
        let mut artifacts = Artifacts::default();

        TranscodeStage.run(&bench.ctx(), &mut artifacts).await.unwrap();

        let names: Vec<&str> = artifacts
            .playlists
            .iter()
            .map(|p| p.relative_path_from_manifest.as_str())
            .collect();
        assert_eq!(names, ["1080p/1080p.m3u8", "720p/720p.m3u8"]);
        assert!(bench.destination().join("720p/720p.m3u8").exists());
        // The fake ffprobe reports no dimensions, so the table is used.
        assert_eq!(artifacts.playlists[1].resolution_width, 1280);

        let done = bench.events().into_iter().any(|e| {
            matches!(e, LogEvent::Progress(p) if p.file == "1080p.m3u8" && p.status == ProgressStatus::Done)
        });
        assert!(done);
    }

    #[tokio::test]
    async fn failing_tiers_fail_the_stage() {
        let mut bench = Bench::new(&[("ffmpeg", "echo broken >&2; exit 1")]);
        bench.config.resolutions = vec![720];
        let mut artifacts = Artifacts::default();

        let err = TranscodeStage.run(&bench.ctx(), &mut artifacts).await.unwrap_err();
        assert!(err.to_string().contains("no renditions"));
        assert!(bench.events().iter().any(|e| matches!(
            e,
            LogEvent::Progress(p) if p.file == "720p.m3u8" && p.status == ProgressStatus::Error
        )));
    }

    #[test]
    fn disabled_without_resolutions() {
        let mut config = Config::default();
        assert!(TranscodeStage.enabled(&config));
        config.resolutions.clear();
        assert!(!TranscodeStage.enabled(&config));
    }
}
