//! Static resolution tier table.
//!
//! Each [`Resolution`] tier maps to fixed pixel dimensions and a target video
//! bitrate. The table is immutable; configuration refers to tiers by their
//! pixel height (`1080`, `"720p"`, ...) and resolves them through
//! [`Resolution::from_tier`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A supported output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    P360,
    P480,
    P720,
    P1080,
    P1440,
    P2160,
}

/// One immutable row of the resolution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSpec {
    pub tier: Resolution,
    pub height: u32,
    pub width: u32,
    /// Target video bitrate in kbit/s.
    pub bitrate_kbps: u32,
}

const TABLE: [ResolutionSpec; 6] = [
    ResolutionSpec { tier: Resolution::P2160, height: 2160, width: 3840, bitrate_kbps: 14_000 },
    ResolutionSpec { tier: Resolution::P1440, height: 1440, width: 2560, bitrate_kbps: 9_000 },
    ResolutionSpec { tier: Resolution::P1080, height: 1080, width: 1920, bitrate_kbps: 6_500 },
    ResolutionSpec { tier: Resolution::P720, height: 720, width: 1280, bitrate_kbps: 4_000 },
    ResolutionSpec { tier: Resolution::P480, height: 480, width: 854, bitrate_kbps: 2_000 },
    ResolutionSpec { tier: Resolution::P360, height: 360, width: 640, bitrate_kbps: 1_000 },
];

impl Resolution {
    /// The highest supported tier, used when no resolution is configured.
    pub const HIGHEST: Resolution = Resolution::P2160;

    /// All tiers, highest first.
    pub fn all() -> impl Iterator<Item = Resolution> {
        TABLE.iter().map(|row| row.tier)
    }

    /// Resolve a tier by its pixel height.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] when no table row has this height.
    pub fn from_tier(height: u32) -> Result<Self> {
        TABLE
            .iter()
            .find(|row| row.height == height)
            .map(|row| row.tier)
            .ok_or_else(|| Error::argument(format!("invalid resolution provided: {height}")))
    }

    /// The table row for this tier.
    pub fn spec(self) -> ResolutionSpec {
        let row = match self {
            Resolution::P2160 => 0,
            Resolution::P1440 => 1,
            Resolution::P1080 => 2,
            Resolution::P720 => 3,
            Resolution::P480 => 4,
            Resolution::P360 => 5,
        };
        TABLE[row]
    }

    pub fn height(self) -> u32 {
        self.spec().height
    }

    pub fn width(self) -> u32 {
        self.spec().width
    }

    pub fn bitrate_kbps(self) -> u32 {
        self.spec().bitrate_kbps
    }

    /// Directory / playlist stem for this tier, e.g. `"720p"`.
    pub fn name(self) -> String {
        format!("{}p", self.height())
    }

    /// Pick the tier used for single-file compression: the highest of the
    /// configured tiers that resolve, or [`Resolution::HIGHEST`] when none do.
    pub fn max_of(tiers: &[u32]) -> Resolution {
        tiers
            .iter()
            .filter_map(|&t| Resolution::from_tier(t).ok())
            .max()
            .unwrap_or(Resolution::HIGHEST)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let height = parse_tier(s)
            .ok_or_else(|| Error::argument(format!("invalid resolution provided: {s}")))?;
        Resolution::from_tier(height)
    }
}

/// Parse a tier token (`"1080"`, `"1080p"`) into its pixel height without
/// checking it against the table.
pub fn parse_tier(s: &str) -> Option<u32> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_suffix('p')
        .or_else(|| trimmed.strip_suffix('P'))
        .unwrap_or(trimmed);
    digits.parse().ok()
}
