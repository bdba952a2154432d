//! Pipeline configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML by the binary
//! and then passed explicitly into the runner. Every section defaults
//! sensibly so an empty file is valid; only the output destination is
//! required before a batch can start (see [`Config::require_output`]).

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::resolution::{parse_tier, Resolution};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory under which one destination folder per input is created.
    pub output: Option<PathBuf>,
    /// Directory scanned for inputs when none are given explicitly.
    pub source_dir: Option<PathBuf>,
    /// Suffix destination folders with a unique id.
    pub use_unique_name: bool,
    /// Resolution tiers (pixel heights) to encode, in processing order.
    #[serde(deserialize_with = "deserialize_tiers")]
    pub resolutions: Vec<u32>,
    pub stages: StagesConfig,
    pub transcription: TranscriptionConfig,
    pub storyboard: StoryboardConfig,
    pub tools: ToolsConfig,
    pub report: ReportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: None,
            source_dir: None,
            use_unique_name: true,
            resolutions: vec![1080, 720, 480],
            stages: StagesConfig::default(),
            transcription: TranscriptionConfig::default(),
            storyboard: StoryboardConfig::default(),
            tools: ToolsConfig::default(),
            report: ReportFormat::default(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Return the output root, failing the whole batch when it is missing.
    pub fn require_output(&self) -> Result<&Path> {
        match self.output.as_deref() {
            Some(p) if !p.as_os_str().is_empty() => Ok(p),
            _ => Err(Error::argument(
                "an output destination has not been specified",
            )),
        }
    }

    /// Resolution tiers parsed from a comma separated list (`"1080,720p"`).
    /// Tokens that are not numbers are dropped with a warning.
    pub fn parse_resolution_list(list: &str) -> Vec<u32> {
        list.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .filter_map(|t| {
                let tier = parse_tier(t);
                if tier.is_none() {
                    tracing::warn!("Ignoring resolution token {t:?}");
                }
                tier
            })
            .collect()
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.output.is_none() {
            warnings.push("output is not set; runs will fail until it is provided".into());
        }

        for (i, tier) in self.resolutions.iter().enumerate() {
            if Resolution::from_tier(*tier).is_err() {
                warnings.push(format!(
                    "resolutions[{i}] = {tier} is not a known tier and will be skipped"
                ));
            }
            if self.resolutions[..i].contains(tier) {
                warnings.push(format!("resolutions[{i}] = {tier} is listed more than once"));
            }
        }

        if self.stages.transcode && self.resolutions.is_empty() {
            warnings.push("transcode is enabled but no resolutions are configured".into());
        }

        if self.stages.mp4 && self.resolutions.is_empty() {
            warnings.push(format!(
                "no resolutions configured; mp4 compression falls back to {}",
                Resolution::HIGHEST
            ));
        }

        for (i, code) in self.transcription.translate_to.iter().enumerate() {
            if code.trim().is_empty() {
                warnings.push(format!("transcription.translate_to[{i}] is empty"));
            } else if code.trim() == self.transcription.language {
                warnings.push(format!(
                    "transcription.translate_to[{i}] = {code:?} is the transcription language and will be skipped"
                ));
            }
        }

        for (i, rep) in self.transcription.replacements.iter().enumerate() {
            if let Err(e) = regex::Regex::new(&rep.pattern) {
                warnings.push(format!(
                    "transcription.replacements[{i}] pattern is invalid: {e}"
                ));
            }
        }

        if self.transcription.engine == TranscriptionEngine::FasterWhisper
            && self.transcription.faster_whisper_script.is_none()
        {
            warnings.push(
                "transcription.engine is faster-whisper but faster_whisper_script is not set"
                    .into(),
            );
        }

        if self.transcription.engine == TranscriptionEngine::FasterWhisper
            && self.transcription.language != "en"
        {
            warnings.push(format!(
                "faster-whisper always transcribes into en; transcription.language = {:?} is ignored",
                self.transcription.language
            ));
        }

        if self.storyboard.interval_secs == 0 {
            warnings.push("storyboard.interval_secs is 0; storyboards will be skipped".into());
        }

        warnings
    }
}

/// Accept tiers written as numbers (`1080`) or strings (`"1080p"`).
fn deserialize_tiers<'de, D>(deserializer: D) -> std::result::Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Token {
        Number(u32),
        Text(String),
    }

    let tokens = Vec::<Token>::deserialize(deserializer)?;
    tokens
        .into_iter()
        .map(|t| match t {
            Token::Number(n) => Ok(n),
            Token::Text(s) => parse_tier(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid resolution {s:?}"))),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Per-stage enable flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    /// Multi-resolution HLS transcode (and the master manifest).
    pub transcode: bool,
    /// Single compressed `video.mp4`.
    pub mp4: bool,
    /// Animated `video.webp` preview.
    pub webp: bool,
    /// `storyboard.jpg` sprite plus `thumbnails.vtt` cues.
    pub storyboard: bool,
    /// Audio extraction, transcription and translation.
    pub transcribe: bool,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            transcode: true,
            mp4: true,
            webp: true,
            storyboard: false,
            transcribe: true,
        }
    }
}

/// Speech-to-text engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptionEngine {
    /// The `whisper` CLI.
    #[default]
    Whisper,
    /// A python script driving faster-whisper.
    FasterWhisper,
}

/// How subtitle files are handed to the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationMode {
    /// Translate the whole `.srt` file in one invocation.
    #[default]
    File,
    /// Translate caption text only and re-merge it into the original timings.
    Captions,
}

/// One vocabulary correction applied to transcripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    /// Regular expression to search for.
    pub pattern: String,
    /// Replacement text (may reference capture groups).
    pub replacement: String,
}

/// Transcription and translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub engine: TranscriptionEngine,
    pub model: String,
    /// Spoken language of the source audio.
    pub language: String,
    /// Target language codes for subtitle translation.
    pub translate_to: Vec<String>,
    pub translation_mode: TranslationMode,
    pub replacements: Vec<Replacement>,
    /// Script path used by [`TranscriptionEngine::FasterWhisper`].
    pub faster_whisper_script: Option<PathBuf>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            engine: TranscriptionEngine::default(),
            model: "large-v2".into(),
            language: "en".into(),
            translate_to: Vec::new(),
            translation_mode: TranslationMode::default(),
            replacements: Vec::new(),
            faster_whisper_script: None,
        }
    }
}

/// Storyboard sprite geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryboardConfig {
    /// Seconds between sampled thumbnails.
    pub interval_secs: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Default for StoryboardConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            tile_width: 160,
            tile_height: 90,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub whisper_path: Option<PathBuf>,
    pub trans_path: Option<PathBuf>,
    pub python_path: Option<PathBuf>,
    /// Maximum run time of a single tool invocation.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            whisper_path: None,
            trans_path: None,
            python_path: None,
            timeout_secs: 86_400,
        }
    }
}

/// How the reporter renders progress and log lines on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human rendering on a terminal, JSON lines otherwise.
    #[default]
    Auto,
    /// In-place terminal rendering.
    Human,
    /// Legacy `TYPE: message` lines.
    Text,
    /// `[type, payload]` JSON lines.
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "human" => Ok(Self::Human),
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::argument(format!("unknown report format {other:?}"))),
        }
    }
}
