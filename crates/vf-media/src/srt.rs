//! SubRip (`.srt`) captions.
//!
//! Parsing is lenient about index lines and trailing cue settings; timing
//! lines must be `HH:MM:SS,mmm --> HH:MM:SS,mmm`. Used by caption-mode
//! translation, which translates caption text only and folds the result
//! back into the original timings with [`merge_translated`].

use std::fmt;
use std::str::FromStr;

use vf_core::{Error, Result};

/// A caption timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SrtTime(pub u64);

impl SrtTime {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Render as `HH:MM:SS` followed by `sep` and milliseconds.
    pub fn format_with(self, sep: char) -> String {
        let ms = self.0;
        format!(
            "{:02}:{:02}:{:02}{}{:03}",
            ms / 3_600_000,
            (ms / 60_000) % 60,
            (ms / 1000) % 60,
            sep,
            ms % 1000
        )
    }
}

impl fmt::Display for SrtTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with(','))
    }
}

impl FromStr for SrtTime {
    type Err = Error;

    /// Accepts `HH:MM:SS,mmm` (a `.` separator is tolerated).
    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Parse(format!("invalid SRT timestamp: {s:?}"));
        let s = s.trim();
        let (hms, millis) = s.split_once([',', '.']).ok_or_else(bad)?;

        let mut parts = hms.split(':');
        let mut next = || -> Result<u64> {
            parts
                .next()
                .and_then(|p| p.trim().parse::<u64>().ok())
                .ok_or_else(bad)
        };
        let (h, m, sec) = (next()?, next()?, next()?);
        if parts.next().is_some() || m >= 60 || sec >= 60 {
            return Err(bad());
        }

        let millis: u64 = millis.trim().parse().map_err(|_| bad())?;
        if millis >= 1000 {
            return Err(bad());
        }
        Ok(Self(((h * 60 + m) * 60 + sec) * 1000 + millis))
    }
}

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub index: usize,
    pub start: SrtTime,
    pub end: SrtTime,
    /// Caption text; multi-line captions keep their `\n` separators.
    pub text: String,
}

impl Caption {
    /// The caption text flattened onto one line.
    pub fn single_line(&self) -> String {
        self.text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse SubRip content.
///
/// Blocks with no text are dropped. A malformed timing line fails the whole
/// parse with [`Error::Parse`].
pub fn parse(content: &str) -> Result<Vec<Caption>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut captions = Vec::new();
    let mut lines = content.lines().peekable();

    loop {
        while lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.next();
        }
        let Some(first) = lines.next() else { break };

        // The index line is optional; some writers start straight with timing.
        let timing = if first.contains("-->") {
            first
        } else {
            match lines.next() {
                Some(line) => line,
                None => break,
            }
        };
        let (start, end) = parse_timing(timing)?;

        let mut text = Vec::new();
        while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
            text.push(line.trim_end());
        }

        if !text.is_empty() {
            captions.push(Caption {
                index: captions.len() + 1,
                start,
                end,
                text: text.join("\n"),
            });
        }
    }

    Ok(captions)
}

fn parse_timing(line: &str) -> Result<(SrtTime, SrtTime)> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| Error::Parse(format!("invalid timing line: {line:?}")))?;
    // Cue settings may follow the end timestamp.
    let end = rest.split_whitespace().next().unwrap_or_default();
    Ok((start.parse()?, end.parse()?))
}

/// Render captions as SubRip, renumbering from 1.
pub fn write(captions: &[Caption]) -> String {
    let mut out = String::new();
    for (i, caption) in captions.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            caption.start,
            caption.end,
            caption.text
        ));
    }
    out
}

/// Replace caption text index-for-index with `translated`.
///
/// When fewer translated lines than captions are supplied, the trailing
/// captions keep their original text and each one is logged as an error.
/// Surplus translated lines are ignored.
pub fn merge_translated(captions: &[Caption], translated: &[String]) -> Vec<Caption> {
    if translated.len() != captions.len() {
        tracing::warn!(
            "Translation returned {} lines for {} captions",
            translated.len(),
            captions.len()
        );
    }

    captions
        .iter()
        .enumerate()
        .map(|(i, caption)| {
            let mut merged = caption.clone();
            match translated.get(i) {
                Some(text) => merged.text = text.trim().to_string(),
                None => tracing::error!(
                    "No translation for caption {}; keeping original text",
                    caption.index
                ),
            }
            merged
        })
        .collect()
}
