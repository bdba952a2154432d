//! Speech-to-text via the whisper CLI or a faster-whisper script.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::command::StreamKind;
use crate::progress::tqdm_percent;
use crate::tools::ToolRegistry;

/// Side-car formats whisper writes with `--output_format all` that are not
/// kept.
const DISCARDED_FORMATS: &[&str] = &["vtt", "tsv", "json"];

/// Files left behind by a successful transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Subtitle file under its canonical `<language>.srt` name.
    pub srt: PathBuf,
    /// Plain-text transcript, when the engine wrote one.
    pub text: Option<PathBuf>,
}

/// Everything before the first `.` of the file name.
fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// Transcribe `audio` with the whisper CLI into `destination`.
///
/// Whisper names its outputs after the audio file; the subtitle is renamed
/// to `<language>.srt` and the other side-cars are removed.
pub async fn transcribe_whisper(
    tools: &ToolRegistry,
    audio: &Path,
    destination: &Path,
    model: &str,
    language: &str,
    mut on_progress: impl FnMut(f64),
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<Transcript> {
    let whisper = tools.require("whisper")?;
    tracing::info!("Transcribe: {:?} (model={model}, language={language})", audio);

    let mut cmd = whisper.command();
    cmd.arg_path(audio);
    cmd.arg("--output_dir").arg_path(destination);
    cmd.args(["--output_format", "all"]);
    cmd.args(["--model", model]);
    cmd.args(["--language", language]);
    cmd.args(["--verbose", "False"]);
    cmd.stream_only();

    cmd.execute_streaming(
        |kind, line| match kind {
            StreamKind::Stderr => match tqdm_percent(line) {
                Some(pct) => on_progress(pct),
                None => tracing::debug!(tool = "whisper", "{line}"),
            },
            StreamKind::Stdout => tracing::debug!(tool = "whisper", "{line}"),
        },
        cancel,
    )
    .await?;

    let stem = file_stem(audio);
    let produced = destination.join(format!("{stem}.srt"));
    let srt = destination.join(format!("{language}.srt"));
    tokio::fs::rename(&produced, &srt).await.map_err(|e| {
        vf_core::Error::tool("whisper", format!("expected subtitle {produced:?}: {e}"))
    })?;

    for ext in DISCARDED_FORMATS {
        let side_car = destination.join(format!("{stem}.{ext}"));
        match tokio::fs::remove_file(&side_car).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {side_car:?}: {e}"),
        }
    }

    let text = destination.join(format!("{stem}.txt"));
    Ok(Transcript {
        srt,
        text: text.exists().then_some(text),
    })
}

/// Language the faster-whisper script always transcribes into.
pub const FASTER_WHISPER_LANGUAGE: &str = "en";

/// Transcribe `audio` with a faster-whisper script run as
/// `python3 <script> <audio> <destination> <model>`. The script writes
/// `en.srt` and `en.txt` itself.
pub async fn transcribe_faster_whisper(
    tools: &ToolRegistry,
    script: &Path,
    audio: &Path,
    destination: &Path,
    model: &str,
    cancel: Option<&CancellationToken>,
) -> vf_core::Result<Transcript> {
    let python = tools.require("python3")?;
    tracing::info!("Transcribe (faster-whisper): {:?} (model={model})", audio);

    let mut cmd = python.command();
    cmd.arg_path(script).arg_path(audio).arg_path(destination).arg(model);
    cmd.stream_only();
    cmd.execute_streaming(
        |_, line| tracing::debug!(tool = "faster-whisper", "{line}"),
        cancel,
    )
    .await?;

    let srt = destination.join(format!("{FASTER_WHISPER_LANGUAGE}.srt"));
    if !srt.exists() {
        return Err(vf_core::Error::tool(
            "faster-whisper",
            format!("script finished without writing {srt:?}"),
        ));
    }
    let text = destination.join(format!("{FASTER_WHISPER_LANGUAGE}.txt"));
    Ok(Transcript {
        srt,
        text: text.exists().then_some(text),
    })
}
