//! Execution context shared by the stages of one file.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use vf_av::{FfprobeProber, MediaProbe, ToolRegistry};
use vf_core::Config;
use vf_wire::{Progress, Reporter};

use crate::queue::QueuedFile;

/// Per-file state every stage can see.
///
/// The source probe is run at most once per file and shared by every
/// stage that needs a duration.
pub struct StageContext<'a> {
    pub file: &'a QueuedFile,
    /// `<output>/<destination_dir>`, created before the first stage runs.
    pub destination: PathBuf,
    pub config: &'a Config,
    pub tools: &'a ToolRegistry,
    pub reporter: &'a Reporter,
    /// Cancelled when the active tool should be stopped.
    pub cancel: CancellationToken,
    probe: &'a OnceCell<Option<MediaProbe>>,
}

impl<'a> StageContext<'a> {
    pub fn new(
        file: &'a QueuedFile,
        destination: PathBuf,
        config: &'a Config,
        tools: &'a ToolRegistry,
        reporter: &'a Reporter,
        probe: &'a OnceCell<Option<MediaProbe>>,
    ) -> Self {
        Self {
            file,
            destination,
            config,
            tools,
            reporter,
            cancel: CancellationToken::new(),
            probe,
        }
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn source(&self) -> &Path {
        &self.file.source
    }

    /// Path of `name` inside the destination folder.
    pub fn output(&self, name: &str) -> PathBuf {
        self.destination.join(name)
    }

    /// An ffprobe prober, when ffprobe was discovered.
    pub fn prober(&self) -> Option<FfprobeProber> {
        self.tools
            .require("ffprobe")
            .ok()
            .map(|cfg| FfprobeProber::new(cfg.path.clone()))
    }

    /// The source probe, computed on first use.
    pub async fn probe(&self) -> Option<&MediaProbe> {
        self.probe
            .get_or_init(|| async {
                let Some(prober) = self.prober() else {
                    tracing::warn!("ffprobe not found; durations are unknown");
                    return None;
                };
                match prober.probe(self.source()).await {
                    Ok(probe) => Some(probe),
                    Err(e) => {
                        tracing::warn!(file = %self.file.filename, "Probe failed: {e}");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    /// Source duration, if it could be probed. Used to scale progress.
    pub async fn duration_hint(&self) -> Option<f64> {
        self.probe().await.and_then(|p| p.duration_secs)
    }

    /// Source duration for stages that cannot run without one.
    ///
    /// # Errors
    ///
    /// [`vf_core::Error::Probe`] when the duration is unknown.
    pub async fn duration(&self) -> vf_core::Result<f64> {
        self.duration_hint().await.ok_or_else(|| {
            vf_core::Error::Probe(format!("could not detect duration of {:?}", self.source()))
        })
    }

    /// Start a progress line for an artifact.
    pub fn progress(&self, label: &str) -> Progress {
        self.reporter.progress(label)
    }
}

/// Close `progress` according to `result`.
pub fn settle<T>(progress: &mut Progress, result: &vf_core::Result<T>) {
    match result {
        Ok(_) => progress.stop(),
        Err(_) => progress.fail(),
    }
}
