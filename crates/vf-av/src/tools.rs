//! Locating the external programs the pipeline drives.
//!
//! [`ToolRegistry::discover`] resolves ffmpeg, ffprobe, whisper, trans and
//! python3 once per run, honouring path overrides from the config. Stages
//! look tools up by name and get a ready [`ToolCommand`] back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// Default tool timeout: one day. Full-length HLS ladders take a while.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Known tool names that the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "whisper", "trans", "python3"];

/// A discovered tool: where it lives and how long one invocation may run.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub name: String,
    pub path: PathBuf,
    /// Invocations running longer than this are killed.
    pub timeout: Duration,
}

impl ToolConfig {
    /// A [`ToolCommand`] for this tool with its timeout applied.
    pub fn command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.path.clone());
        cmd.timeout(self.timeout);
        cmd
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `--version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`vf_core::config::ToolsConfig`] supplies a
    /// custom path **and** that path exists, it is used directly.  Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`.  Tools that are
    /// not found are silently omitted from the registry.
    pub fn discover(tools_config: &vf_core::config::ToolsConfig) -> Self {
        let timeout = Duration::from_secs(tools_config.timeout_secs.max(1));
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                "whisper" => tools_config.whisper_path.as_deref(),
                "trans" => tools_config.trans_path.as_deref(),
                "python3" => tools_config.python_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!("Configured {name} path {p:?} does not exist; searching PATH");
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        timeout,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit `(name, path)` pairs without touching
    /// `PATH`.
    pub fn from_paths<'a>(entries: impl IntoIterator<Item = (&'a str, PathBuf)>) -> Self {
        let tools = entries
            .into_iter()
            .map(|(name, path)| {
                (
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        timeout: DEFAULT_TIMEOUT,
                    },
                )
            })
            .collect();
        Self { tools }
    }

    /// Return a reference to the [`ToolConfig`] for the given tool, or an
    /// [`vf_core::Error::Tool`] if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> vf_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| {
            vf_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Whether a tool was discovered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, &cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }

    /// Iterate over all registered tool configs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolConfig)> {
        self.tools.iter()
    }
}

/// Run `<tool> --version` (or `-version` for ffmpeg/ffprobe) and return the
/// first line of output.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    // python3 prints its version on stderr on older releases.
    let text = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    String::from_utf8_lossy(&text)
        .lines()
        .next()
        .map(|s| s.trim().to_string())
}
