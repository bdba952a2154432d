//! Files produced for one queued input, threaded from stage to stage.

use std::path::PathBuf;

use serde::Serialize;
use vf_media::StagePlaylist;

/// Everything the stages of one file have produced so far.
///
/// This doubles as the per-file results record: `compressed`, `preview`,
/// `audio` and `transcription` are `None` when the stage was disabled or
/// yielded nothing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Artifacts {
    /// Per-resolution sub-playlists, in processing order.
    pub playlists: Vec<StagePlaylist>,
    pub manifest: Option<PathBuf>,
    pub compressed: Option<PathBuf>,
    pub preview: Option<PathBuf>,
    pub storyboard: Option<PathBuf>,
    pub thumbnails: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    /// Set only when audio extraction wrote `audio`; cleanup deletes the
    /// file only then.
    #[serde(skip)]
    pub audio_created: bool,
    pub transcription: Option<PathBuf>,
    pub transcript_text: Option<PathBuf>,
    /// `(language code, subtitle path)` per successful translation.
    pub translations: Vec<(String, PathBuf)>,
}
