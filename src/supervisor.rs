//! Out-of-process runs: spawn a worker and follow its wire stream.
//!
//! The worker's stdout is decoded with [`vf_wire::parse`] and its stderr with
//! [`vf_wire::parse_stderr`]; both feed one [`QueueMonitor`] and are
//! re-rendered through the supervisor's own [`Reporter`].

use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use vf_wire::{LogEvent, QueueMonitor, Reporter};

/// What the supervisor saw once the worker exited.
#[derive(Debug)]
pub struct SupervisorOutcome {
    pub status: ExitStatus,
    pub monitor: QueueMonitor,
}

/// Spawns a worker process and relays its events.
pub struct Supervisor {
    program: PathBuf,
    args: Vec<OsString>,
    reporter: Reporter,
}

impl Supervisor {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I, reporter: Reporter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            reporter,
        }
    }

    /// Supervisor for `vodforge worker` using the running executable.
    pub fn for_current_exe<I, S>(args: I, reporter: Reporter) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let exe = std::env::current_exe().context("Failed to locate the vodforge executable")?;
        let mut worker_args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        worker_args.insert(0, "worker".into());
        Ok(Self::new(exe, worker_args, reporter))
    }

    /// Run the worker to completion. When `shutdown` resolves the worker is
    /// asked to stop with SIGTERM and the stream is followed until it exits.
    pub async fn run<F>(self, shutdown: F) -> Result<SupervisorOutcome>
    where
        F: Future<Output = ()>,
    {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn worker {:?}", self.program))?;
        tracing::debug!(pid = ?child.id(), "Worker started");

        let stdout = child.stdout.take().context("Worker stdout was not captured")?;
        let stderr = child.stderr.take().context("Worker stderr was not captured")?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let out_task = tokio::spawn(relay(stdout, tx.clone(), vf_wire::parse));
        let err_task = tokio::spawn(relay(stderr, tx, vf_wire::parse_stderr));

        let mut monitor = QueueMonitor::new();
        let mut signalled = false;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        monitor.apply(&event);
                        self.reporter.emit(&event);
                    }
                    None => break,
                },
                _ = &mut shutdown, if !signalled => {
                    signalled = true;
                    tracing::info!("Stopping worker");
                    stop(&mut child);
                }
            }
        }

        let _ = tokio::join!(out_task, err_task);
        let status = child.wait().await.context("Failed to wait for worker")?;
        tracing::debug!(%status, "Worker exited");

        Ok(SupervisorOutcome { status, monitor })
    }
}

/// Decode `reader` line by line until it closes.
async fn relay<R>(reader: R, tx: mpsc::UnboundedSender<LogEvent>, decode: fn(&str) -> LogEvent)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(decode(&line)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Worker stream read failed: {e}");
                break;
            }
        }
    }
}

fn stop(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(pid) {
            if kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok() {
                return;
            }
        }
    }

    if let Err(e) = child.start_kill() {
        tracing::debug!("kill failed: {e}");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use vf_core::config::ReportFormat;
    use vf_wire::{MemoryWriter, ProgressStatus};

    fn sh(script: &str, out: &MemoryWriter) -> Supervisor {
        Supervisor::new(
            "/bin/sh",
            ["-c", script],
            Reporter::with_writer(ReportFormat::Human, out.clone()),
        )
    }

    #[tokio::test]
    async fn follows_a_worker_stream() {
        let out = MemoryWriter::new();
        let script = r#"
echo '["progress",{"file":"movie.mp4","percent":0,"status":"Queued"}]'
echo '["step",{"index":1,"process":"transcode","file":"movie.mp4","percent":0,"status":"Working"}]'
echo '["progress",{"file":"720p.m3u8","percent":50,"status":"Working"}]'
echo 'STEP@1: {"process":"transcode","file":"movie.mp4","status":"Done"}'
echo '["progress",{"file":"movie.mp4","percent":100,"status":"Done"}]'
echo 'worker noise' >&2
"#;
        let outcome = sh(script, &out).run(std::future::pending()).await.unwrap();

        assert!(outcome.status.success());
        assert_eq!(outcome.monitor.completed(), 1);
        let file = outcome.monitor.file("movie.mp4").unwrap();
        assert_eq!(file.status, ProgressStatus::Done);
        assert!(file.artifact("720p.m3u8").is_some());

        let rendered = out.contents();
        assert!(rendered.contains("movie.mp4: Complete"), "{rendered}");
        assert!(rendered.contains("error: worker noise"), "{rendered}");
    }

    #[tokio::test]
    async fn mirrors_worker_exit_status() {
        let out = MemoryWriter::new();
        let outcome = sh("exit 3", &out).run(std::future::pending()).await.unwrap();
        assert_eq!(outcome.status.code(), Some(3));
    }

    #[tokio::test]
    async fn shutdown_terminates_the_worker() {
        let out = MemoryWriter::new();
        let outcome = sh("echo '[\"info\",\"started\"]'; exec sleep 30", &out)
            .run(tokio::time::sleep(std::time::Duration::from_millis(200)))
            .await
            .unwrap();
        assert!(!outcome.status.success());
        assert!(out.contents().contains("started"));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let out = MemoryWriter::new();
        let sup = Supervisor::new(
            "/nonexistent/vodforge",
            Vec::<String>::new(),
            Reporter::with_writer(ReportFormat::Json, out),
        );
        assert!(sup.run(std::future::pending()).await.is_err());
    }
}
