//! Environment and command line layers applied over the file config.

use std::path::PathBuf;

use vf_core::config::ReportFormat;
use vf_core::Config;

use crate::cli::RunArgs;

/// Environment variables consulted by [`apply_env`].
pub const ENV_VARS: &[&str] = &[
    "OUTPUT_LOCATION",
    "SOURCE_LOCATION",
    "USE_UNIQUE_NAME",
    "INCLUDE_MP4",
    "INCLUDE_WEBP",
    "INCLUDE_TRANSCRIPTION",
    "TRANSCRIPTION_LANGS",
    "RESOLUTIONS",
];

/// Override `config` from environment variables read through `lookup`.
///
/// Empty values are ignored. Unparsable booleans are logged and ignored.
pub fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("OUTPUT_LOCATION") {
        config.output = Some(PathBuf::from(v));
    }
    if let Some(v) = get("SOURCE_LOCATION") {
        config.source_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = get_bool(&get, "USE_UNIQUE_NAME") {
        config.use_unique_name = v;
    }
    if let Some(v) = get_bool(&get, "INCLUDE_MP4") {
        config.stages.mp4 = v;
    }
    if let Some(v) = get_bool(&get, "INCLUDE_WEBP") {
        config.stages.webp = v;
    }
    if let Some(v) = get_bool(&get, "INCLUDE_TRANSCRIPTION") {
        config.stages.transcribe = v;
    }
    if let Some(v) = get("TRANSCRIPTION_LANGS") {
        config.transcription.translate_to = split_list(&v);
    }
    if let Some(v) = get("RESOLUTIONS") {
        config.resolutions = Config::parse_resolution_list(&v);
    }
}

fn get_bool<G>(get: &G, key: &str) -> Option<bool>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Ignoring {key}={raw:?}: expected true or false");
            None
        }
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Override `config` from `run`/`worker`/`supervise` flags. Flags win over
/// both the file and the environment.
pub fn apply_run_args(config: &mut Config, args: &RunArgs) {
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if let Some(dir) = &args.source_dir {
        config.source_dir = Some(dir.clone());
    }
    if let Some(list) = &args.resolutions {
        config.resolutions = Config::parse_resolution_list(list);
    }
    if args.unique {
        config.use_unique_name = true;
    }
    if args.no_unique {
        config.use_unique_name = false;
    }
    if args.no_mp4 {
        config.stages.mp4 = false;
    }
    if args.no_webp {
        config.stages.webp = false;
    }
    if args.no_transcribe {
        config.stages.transcribe = false;
    }
    if args.storyboard {
        config.stages.storyboard = true;
    }
    if let Some(langs) = &args.translate {
        config.transcription.translate_to = split_list(langs);
    }
    if let Some(format) = args.format {
        config.report = ReportFormat::from(format);
    }
}
