use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use vf_core::config::ReportFormat;

#[derive(Parser)]
#[command(name = "vodforge")]
#[command(author, version, about = "Turn raw videos into HLS, MP4, preview and subtitle bundles")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process videos in this process, rendering progress on the terminal
    Run(RunArgs),

    /// Process videos, speaking the wire protocol on stdout
    Worker(RunArgs),

    /// Spawn a worker and follow its progress
    Supervise(RunArgs),

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Output format accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Auto,
    Human,
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => ReportFormat::Auto,
            FormatArg::Human => ReportFormat::Human,
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

/// Options shared by `run`, `worker` and `supervise`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Input videos (defaults to the files in the configured source directory)
    pub sources: Vec<PathBuf>,

    /// Output root; one folder per input is created beneath it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory scanned for inputs when none are given
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Comma separated resolution tiers, e.g. "1080,720"
    #[arg(short, long)]
    pub resolutions: Option<String>,

    /// Suffix destination folders with a unique id
    #[arg(long, overrides_with = "no_unique")]
    pub unique: bool,

    /// Name destination folders after the input only
    #[arg(long)]
    pub no_unique: bool,

    /// Skip the compressed MP4
    #[arg(long)]
    pub no_mp4: bool,

    /// Skip the animated WebP preview
    #[arg(long)]
    pub no_webp: bool,

    /// Skip audio extraction, transcription and translation
    #[arg(long)]
    pub no_transcribe: bool,

    /// Generate a storyboard sprite and thumbnail cues
    #[arg(long)]
    pub storyboard: bool,

    /// Comma separated subtitle translation targets, e.g. "es,fr"
    #[arg(long)]
    pub translate: Option<String>,

    /// Progress output format
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

impl RunArgs {
    /// Re-encode the options as command line arguments for a child worker.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |flag: &str, value: Option<String>| {
            args.push(flag.to_string());
            if let Some(v) = value {
                args.push(v);
            }
        };

        if let Some(output) = &self.output {
            push("--output", Some(output.display().to_string()));
        }
        if let Some(dir) = &self.source_dir {
            push("--source-dir", Some(dir.display().to_string()));
        }
        if let Some(res) = &self.resolutions {
            push("--resolutions", Some(res.clone()));
        }
        if self.unique {
            push("--unique", None);
        }
        if self.no_unique {
            push("--no-unique", None);
        }
        if self.no_mp4 {
            push("--no-mp4", None);
        }
        if self.no_webp {
            push("--no-webp", None);
        }
        if self.no_transcribe {
            push("--no-transcribe", None);
        }
        if self.storyboard {
            push("--storyboard", None);
        }
        if let Some(langs) = &self.translate {
            push("--translate", Some(langs.clone()));
        }

        args.extend(self.sources.iter().map(|s| s.display().to_string()));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_parse_and_reencode() {
        let cli = Cli::parse_from([
            "vodforge",
            "supervise",
            "-o",
            "/srv/out",
            "--resolutions",
            "1080,720",
            "--no-webp",
            "--translate",
            "es,fr",
            "a.mp4",
            "b.mkv",
        ]);
        let Commands::Supervise(args) = cli.command else {
            panic!("expected supervise");
        };
        assert_eq!(args.sources.len(), 2);

        let reparsed = Cli::parse_from(
            ["vodforge".to_string(), "worker".to_string()]
                .into_iter()
                .chain(args.to_args()),
        );
        let Commands::Worker(worker) = reparsed.command else {
            panic!("expected worker");
        };
        assert_eq!(worker.output, Some(PathBuf::from("/srv/out")));
        assert_eq!(worker.resolutions.as_deref(), Some("1080,720"));
        assert!(worker.no_webp);
        assert!(!worker.no_mp4);
        assert_eq!(worker.translate.as_deref(), Some("es,fr"));
        assert_eq!(worker.sources, args.sources);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vodforge", "check-tools", "-v", "-c", "x.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
