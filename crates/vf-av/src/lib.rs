//! # vf-av
//!
//! External media tools for the vodforge pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg,
//!   ffprobe, whisper, trans and python3.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout,
//!   line streaming and SIGTERM-then-kill cancellation.
//! - **Probing** ([`FfprobeProber`]) -- duration, dimensions and audio
//!   presence via ffprobe.
//! - **Progress parsing** ([`progress`]) -- ffmpeg `-progress` blocks and
//!   tqdm bars turned into percentages.
//! - **Action functions** ([`actions`]) -- HLS renditions, HEVC compression,
//!   WebP previews, audio extraction, storyboard sprites, transcription and
//!   translation.

pub mod actions;
pub mod command;
pub mod probe;
pub mod progress;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{StreamKind, ToolCommand, ToolOutput};
pub use probe::{FfprobeProber, MediaProbe};
pub use progress::{tqdm_percent, FfmpegProgress};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry, KNOWN_TOOLS};

// Action functions
pub use actions::{
    animated_preview, compress_mp4, extract_audio, preview_window, storyboard_sprite,
    transcode_hls, transcribe_faster_whisper, transcribe_whisper, translate_file, translate_text,
    HlsRendition, Transcript, FASTER_WHISPER_LANGUAGE, PREVIEW_LENGTH_SECS,
};
