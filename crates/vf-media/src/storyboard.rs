//! Storyboard sprite geometry and the WebVTT thumbnail track.

use std::path::{Path, PathBuf};

use crate::srt::SrtTime;

/// Sprite image name referenced by every cue.
pub const STORYBOARD_JPG: &str = "storyboard.jpg";
/// Cue file written next to the sprite.
pub const THUMBNAILS_VTT: &str = "thumbnails.vtt";

/// Layout of the thumbnails tiled into one sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryboardGrid {
    pub count: u32,
    pub columns: u32,
    pub rows: u32,
    pub interval_secs: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl StoryboardGrid {
    /// A near-square grid holding one tile every `interval_secs` of
    /// `duration_secs`. Returns `None` for a zero interval or a
    /// non-positive duration.
    pub fn new(duration_secs: f64, interval_secs: u32, tile_width: u32, tile_height: u32) -> Option<Self> {
        if interval_secs == 0 || !(duration_secs > 0.0) {
            return None;
        }
        let count = (duration_secs / f64::from(interval_secs)).ceil() as u32;
        let columns = f64::from(count).sqrt().ceil() as u32;
        let rows = count.div_ceil(columns);
        Some(Self {
            count,
            columns,
            rows,
            interval_secs,
            tile_width,
            tile_height,
        })
    }

    /// Top-left pixel of tile `i` inside the sprite.
    pub fn tile_origin(&self, i: u32) -> (u32, u32) {
        (
            (i % self.columns) * self.tile_width,
            (i / self.columns) * self.tile_height,
        )
    }

    /// Render the `thumbnails.vtt` cue file.
    pub fn to_vtt(&self) -> String {
        let mut out = String::from("WEBVTT\n\n");
        let step = u64::from(self.interval_secs) * 1000;
        for i in 0..self.count {
            let start = SrtTime::from_millis(u64::from(i) * step);
            let end = SrtTime::from_millis(u64::from(i + 1) * step);
            let (x, y) = self.tile_origin(i);
            out.push_str(&format!(
                "{} --> {}\n{STORYBOARD_JPG}#xywh={x},{y},{},{}\n\n",
                start.format_with('.'),
                end.format_with('.'),
                self.tile_width,
                self.tile_height
            ));
        }
        out
    }

    /// Write `thumbnails.vtt` into `destination`.
    pub async fn write_vtt(&self, destination: &Path) -> vf_core::Result<PathBuf> {
        let path = destination.join(THUMBNAILS_VTT);
        tokio::fs::write(&path, self.to_vtt()).await?;
        Ok(path)
    }
}
