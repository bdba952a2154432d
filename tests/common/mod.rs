//! Shared harness for integration tests.
//!
//! Provides [`Harness`], a scratch directory holding a source video, fake
//! external tools written as shell scripts and an output root, plus a
//! [`Runner`] wired to them with a JSON reporter captured in memory.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use vf_av::ToolRegistry;
use vf_core::config::ReportFormat;
use vf_core::Config;
use vf_pipeline::Runner;
use vf_wire::{LogEvent, MemoryWriter, Reporter};

/// ffmpeg that reports progress and creates its last argument.
pub const FFMPEG: &str = r#"
for last; do :; done
printf 'out_time_us=2000000\nprogress=continue\n'
printf 'out_time_us=8000000\nprogress=end\n'
: > "$last"
"#;

/// ffmpeg whose audio extraction produces nothing.
pub const FFMPEG_NO_AUDIO: &str = r#"
for last; do :; done
case "$last" in *audio.mp4) echo "no audio stream" >&2; exit 1 ;; esac
: > "$last"
"#;

/// ffmpeg that cannot write a compressed `video.mp4`.
pub const FFMPEG_NO_MP4: &str = r#"
for last; do :; done
case "$last" in */video.mp4) echo "encoder crashed" >&2; exit 1 ;; esac
: > "$last"
"#;

/// ffmpeg that never finishes on its own.
pub const FFMPEG_STUCK: &str = "exec sleep 30";

/// ffprobe describing an eight second video without readable dimensions.
pub const FFPROBE: &str = r#"printf '{"format":{"duration":"8.0"},"streams":[{"codec_type":"video","duration":"8.0"},{"codec_type":"audio"}]}'"#;

/// whisper writing `<stem>.srt` and `<stem>.txt` into `--output_dir`.
pub const WHISPER: &str = r#"
audio="$1"; shift
while [ $# -gt 0 ]; do
  case "$1" in --output_dir) out="$2"; shift ;; esac
  shift
done
stem=$(basename "$audio"); stem=${stem%%.*}
printf '1\n00:00:00,000 --> 00:00:02,000\nhello there\n\n' > "$out/$stem.srt"
echo "hello there" > "$out/$stem.txt"
"#;

/// `trans :<code> -b -i <in> -o <out>` that cannot reach Spanish.
pub const TRANS_NO_SPANISH: &str = r#"
[ "$1" = ":es" ] && { echo "es unavailable" >&2; exit 1; }
cp "$4" "$6"
"#;

/// Write an executable shell script named `name` into `dir`.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Scratch workspace for a pipeline run.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub bin: PathBuf,
    pub source: PathBuf,
    pub output: PathBuf,
    pub config: Config,
    pub out: MemoryWriter,
}

impl Harness {
    /// A harness with `movie.mp4`, the given fake tools and a config that
    /// names destinations after the input only.
    pub fn new(tools: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        for (name, body) in tools {
            fake_tool(&bin, name, body);
        }

        let source = dir.path().join("movie.mp4");
        std::fs::write(&source, b"not really video").unwrap();
        let output = dir.path().join("out");

        let config = Config {
            output: Some(output.clone()),
            use_unique_name: false,
            ..Config::default()
        };

        Self {
            dir,
            bin,
            source,
            output,
            config,
            out: MemoryWriter::new(),
        }
    }

    /// Registry pointing at every fake tool in `bin`.
    pub fn tools(&self) -> ToolRegistry {
        let entries: Vec<(String, PathBuf)> = std::fs::read_dir(&self.bin)
            .unwrap()
            .map(|e| e.unwrap())
            .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
            .collect();
        ToolRegistry::from_paths(entries.iter().map(|(n, p)| (n.as_str(), p.clone())))
    }

    pub fn runner(&self) -> Runner {
        let reporter = Reporter::with_writer(ReportFormat::Json, self.out.clone());
        Runner::new(self.config.clone(), self.tools(), reporter).unwrap()
    }

    /// `<output>/movie`.
    pub fn destination(&self) -> PathBuf {
        self.output.join("movie")
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.out.lines().iter().map(|l| vf_wire::parse(l)).collect()
    }
}
