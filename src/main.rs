use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use vf_av::{FfprobeProber, ToolRegistry};
use vf_core::config::ReportFormat;
use vf_core::Config;
use vf_pipeline::{FileQueue, Runner, RunnerHandle};
use vf_wire::{Reporter, WireLayer};
use vodforge::cli::{Cli, Commands, RunArgs};
use vodforge::config::{self, ENV_VARS};
use vodforge::sources;
use vodforge::supervisor::Supervisor;

/// Exit status of a run stopped by a signal.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vodforge=debug,vf_core=debug,vf_wire=debug,vf_av=debug,vf_media=debug,vf_pipeline=debug"
                .to_string()
        } else {
            "vodforge=info,vf_core=info,vf_av=info,vf_media=info,vf_pipeline=info".to_string()
        }
    });

    match cli.command {
        Commands::Run(args) => {
            init_stderr_logging(&env_filter);
            let config = effective_config(cli.config.as_deref(), &args)?;
            let reporter = Reporter::stdout(config.report);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_pipeline(config, args.sources, reporter))
        }
        Commands::Worker(args) => {
            let mut config = effective_config(cli.config.as_deref(), &args)?;
            // A worker always speaks the wire protocol.
            if !matches!(config.report, ReportFormat::Text) {
                config.report = ReportFormat::Json;
            }
            let reporter = Reporter::stdout(config.report);
            tracing_subscriber::registry()
                .with(EnvFilter::new(&env_filter))
                .with(WireLayer::new(reporter.clone()))
                .init();
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_pipeline(config, args.sources, reporter))
        }
        Commands::Supervise(args) => {
            init_stderr_logging(&env_filter);
            let mut worker_args = Vec::new();
            if let Some(path) = &cli.config {
                worker_args.push("--config".to_string());
                worker_args.push(path.display().to_string());
            }
            if cli.verbose {
                worker_args.push("--verbose".to_string());
            }
            worker_args.extend(["--format".to_string(), "json".to_string()]);
            worker_args.extend(args.to_args());

            let reporter = Reporter::stdout(ReportFormat::Human);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(supervise(worker_args, reporter))
        }
        Commands::Probe { file, json } => {
            init_stderr_logging(&env_filter);
            let config = config::load_effective(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, &config, json))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckTools => {
            init_stderr_logging(&env_filter);
            let config = config::load_effective(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            init_stderr_logging(&env_filter);
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("vodforge {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Human modes keep stdout for the reporter and log to stderr.
fn init_stderr_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

/// File config, then environment, then flags.
fn effective_config(path: Option<&Path>, args: &RunArgs) -> Result<Config> {
    let mut config = config::load_effective(path)?;
    config::apply_run_args(&mut config, args);
    Ok(config)
}

async fn run_pipeline(config: Config, sources: Vec<PathBuf>, reporter: Reporter) -> Result<ExitCode> {
    if let Err(e) = config.require_output() {
        tracing::error!("{e}");
        return Ok(ExitCode::FAILURE);
    }

    let inputs = if !sources.is_empty() {
        sources
    } else if let Some(dir) = &config.source_dir {
        sources::discover(dir)?
    } else {
        tracing::error!("No input files given and no source directory configured");
        return Ok(ExitCode::FAILURE);
    };

    let mut queue = FileQueue::create(&inputs, config.use_unique_name);
    if queue.is_empty() {
        tracing::warn!("Nothing to process");
        return Ok(ExitCode::SUCCESS);
    }
    tracing::info!("Queued {} of {} inputs", queue.len(), inputs.len());

    let tools = ToolRegistry::discover(&config.tools);
    let runner = Runner::new(config, tools, reporter).context("Failed to start the pipeline")?;
    let handle = runner.handle();

    let interrupt = tokio::spawn(cancel_on_shutdown(handle.clone()));
    #[cfg(unix)]
    let skipper = tokio::spawn(skip_on_usr1(handle));

    let summary = runner.run(&mut queue).await?;

    interrupt.abort();
    #[cfg(unix)]
    skipper.abort();

    tracing::info!(
        success = summary.failed == 0 && !summary.cancelled,
        "Processed {} files: {} completed, {} failed",
        summary.files.len(),
        summary.completed,
        summary.failed
    );

    if summary.cancelled {
        Ok(ExitCode::from(EXIT_INTERRUPTED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn supervise(worker_args: Vec<String>, reporter: Reporter) -> Result<ExitCode> {
    let supervisor = Supervisor::for_current_exe(worker_args, reporter.clone())?;
    let outcome = supervisor.run(shutdown_signal()).await?;

    let monitor = &outcome.monitor;
    for message in monitor.orphan_errors() {
        tracing::debug!("Worker error outside any file: {message}");
    }
    reporter.info(format!(
        "{} completed, {} failed",
        monitor.completed(),
        monitor.failed()
    ));

    Ok(match outcome.status.code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::from(EXIT_INTERRUPTED),
    })
}

async fn cancel_on_shutdown(handle: RunnerHandle) {
    shutdown_signal().await;
    tracing::warn!("Interrupted; stopping the current stage");
    handle.cancel();
}

/// `SIGUSR1` abandons the active stage and moves on to the next one.
#[cfg(unix)]
async fn skip_on_usr1(handle: RunnerHandle) {
    let mut sig = match signal::unix::signal(signal::unix::SignalKind::user_defined1()) {
        Ok(sig) => sig,
        Err(e) => {
            tracing::debug!("Failed to install SIGUSR1 handler: {}", e);
            return;
        }
    };
    while sig.recv().await.is_some() {
        tracing::info!("Skipping the current stage");
        handle.skip_stage();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn probe_file(file: &Path, config: &Config, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let ffprobe = tools.require("ffprobe")?;
    let probe = FfprobeProber::new(ffprobe.path.clone())
        .probe(file)
        .await
        .with_context(|| format!("Failed to probe {:?}", file))?;

    if json {
        let json_str = serde_json::to_string_pretty(&probe)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", file.display());
    match probe.duration_secs {
        Some(duration) => {
            let secs = duration as u64;
            let mins = secs / 60;
            let hours = mins / 60;
            println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
        }
        None => println!("Duration: unknown"),
    }
    match probe.dimensions() {
        Some((w, h)) => println!("Video: {}x{}", w, h),
        None => println!("Video: none"),
    }
    println!("Audio: {}", if probe.has_audio { "yes" } else { "no" });

    Ok(())
}

fn check_tools(config: &Config) -> Result<ExitCode> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut required_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            if matches!(tool.name.as_str(), "ffmpeg" | "ffprobe") {
                required_ok = false;
            }
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if required_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg and ffprobe are required. Install them to process videos.");
    }
    if tools.iter().any(|t| !t.available) {
        println!("whisper, trans and python3 are only needed for transcription and translation.");
    }

    Ok(ExitCode::SUCCESS)
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, searching default locations");
            config::load_config_or_default(None)?
        }
    };
    println!("✓ Configuration is valid");
    println!(
        "  Output: {}",
        config
            .output
            .as_ref()
            .map_or_else(|| "(not set)".to_string(), |p| p.display().to_string())
    );
    println!("  Resolutions: {:?}", config.resolutions);
    println!(
        "  Stages: transcode={} mp4={} webp={} storyboard={} transcribe={}",
        config.stages.transcode,
        config.stages.mp4,
        config.stages.webp,
        config.stages.storyboard,
        config.stages.transcribe
    );
    println!("  Translate to: {:?}", config.transcription.translate_to);

    let overridden: Vec<&str> = ENV_VARS
        .iter()
        .copied()
        .filter(|key| std::env::var_os(key).is_some())
        .collect();
    if !overridden.is_empty() {
        println!("  Environment overrides: {}", overridden.join(", "));
    }

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
