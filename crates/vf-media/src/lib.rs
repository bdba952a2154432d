//! vf-media: the plain-text formats a finished bundle is made of.
//!
//! # Modules
//!
//! - [`manifest`] - HLS master playlist assembled from per-tier sub-playlists
//! - [`srt`] - SubRip parsing, writing and index-for-index text re-merge
//! - [`storyboard`] - Thumbnail sprite grid geometry and WebVTT cue file
//! - [`replace`] - Vocabulary corrections applied to transcripts

pub mod manifest;
pub mod replace;
pub mod srt;
pub mod storyboard;

// Re-export commonly used items at the crate root.
pub use manifest::{generate_master_manifest, write_master_manifest, StagePlaylist, MASTER_MANIFEST};
pub use replace::ReplacementTable;
pub use srt::{merge_translated, Caption, SrtTime};
pub use storyboard::{StoryboardGrid, STORYBOARD_JPG, THUMBNAILS_VTT};
