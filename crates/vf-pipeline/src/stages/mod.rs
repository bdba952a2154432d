//! Built-in stages, in pipeline order.

mod audio;
mod cleanup;
mod compress;
mod manifest;
mod preview;
mod storyboard;
mod transcode;
mod transcribe;
mod translate;

pub use audio::AudioStage;
pub use cleanup::CleanupStage;
pub use compress::CompressStage;
pub use manifest::ManifestStage;
pub use preview::PreviewStage;
pub use storyboard::StoryboardStage;
pub use transcode::TranscodeStage;
pub use transcribe::TranscribeStage;
pub use translate::TranslateStage;

use crate::stage::Stage;

/// Output names inside a destination folder.
pub const COMPRESSED_MP4: &str = "video.mp4";
pub const PREVIEW_WEBP: &str = "video.webp";
pub const AUDIO_MP4: &str = "audio.mp4";

/// The full stage list: transcode, manifest, compress, preview, storyboard,
/// audio extraction, transcription, translation, audio cleanup.
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(TranscodeStage),
        Box::new(ManifestStage),
        Box::new(CompressStage),
        Box::new(PreviewStage),
        Box::new(StoryboardStage),
        Box::new(AudioStage),
        Box::new(TranscribeStage),
        Box::new(TranslateStage),
        Box::new(CleanupStage),
    ]
}
