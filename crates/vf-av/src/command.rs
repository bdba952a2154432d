//! Builder for executing external tool commands with timeout, line streaming
//! and cancellation.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How long a cancelled process gets between SIGTERM and SIGKILL.
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). For streamed runs this is only
    /// the trailing lines.
    pub stderr: String,
}

/// Which pipe a streamed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use vf_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> vf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("quiet")
///     .arg("-print_format").arg("json")
///     .arg("-show_format")
///     .arg("/path/to/video.mkv")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    kill_grace: Duration,
    stdin_data: Option<Vec<u8>>,
    current_dir: Option<PathBuf>,
    keep_stdout: bool,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            kill_grace: DEFAULT_KILL_GRACE,
            stdin_data: None,
            current_dir: None,
            keep_stdout: true,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append a path argument.
    pub fn arg_path(&mut self, p: &Path) -> &mut Self {
        self.args.push(p.to_string_lossy().into_owned());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Set the delay between SIGTERM and a hard kill on cancellation.
    pub fn kill_grace(&mut self, d: Duration) -> &mut Self {
        self.kill_grace = d;
        self
    }

    /// Provide data to be written to the process's stdin.
    pub fn stdin(&mut self, data: Vec<u8>) -> &mut Self {
        self.stdin_data = Some(data);
        self
    }

    /// Run the process in `dir`.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Do not accumulate stdout during [`ToolCommand::execute_streaming`];
    /// lines are still handed to the callback.
    pub fn stream_only(&mut self) -> &mut Self {
        self.keep_stdout = false;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Short tool name used in errors and logs.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn spawn(&self) -> vf_core::Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(tool = %self.program_name(), args = ?self.args, "spawning");

        let mut child = cmd
            .spawn()
            .map_err(|e| vf_core::Error::tool(self.program_name(), format!("failed to spawn: {e}")))?;

        // Feed stdin from a task so a chatty child cannot deadlock against us.
        if let (Some(data), Some(mut stdin)) = (self.stdin_data.clone(), child.stdin.take()) {
            let tool = self.program_name();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&data).await {
                    tracing::debug!(%tool, "stdin closed early: {e}");
                }
            });
        }

        Ok(child)
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`vf_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`vf_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`vf_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> vf_core::Result<ToolOutput> {
        let program_name = self.program_name();
        let child = self.spawn()?;

        // Dropping the wait future on timeout drops the child, and
        // `kill_on_drop` reaps it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(vf_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(vf_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(vf_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    /// Execute the command, handing every stdout/stderr line to `on_line` as
    /// it arrives. Both `\n` and `\r` end a line so in-place progress bars
    /// are seen as they update.
    ///
    /// When `cancel` fires the process receives SIGTERM, then a hard kill
    /// after the grace period, and [`vf_core::Error::Cancelled`] is returned.
    ///
    /// # Errors
    ///
    /// Same as [`ToolCommand::execute`], plus [`vf_core::Error::Cancelled`].
    pub async fn execute_streaming(
        &self,
        mut on_line: impl FnMut(StreamKind, &str),
        cancel: Option<&CancellationToken>,
    ) -> vf_core::Result<ToolOutput> {
        let program_name = self.program_name();
        let mut child = self.spawn()?;

        let (tx, mut rx) = mpsc::channel::<(StreamKind, String)>(256);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, StreamKind::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, StreamKind::Stderr, tx.clone()));
        }
        drop(tx);

        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(cancelled);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut stdout = String::new();
        let mut stderr_tail: Vec<String> = Vec::new();
        let mut streams_open = true;

        let status = loop {
            tokio::select! {
                msg = rx.recv(), if streams_open => match msg {
                    Some((kind, line)) => {
                        match kind {
                            StreamKind::Stdout if self.keep_stdout => {
                                stdout.push_str(&line);
                                stdout.push('\n');
                            }
                            StreamKind::Stderr => {
                                if stderr_tail.len() == STDERR_TAIL {
                                    stderr_tail.remove(0);
                                }
                                stderr_tail.push(line.clone());
                            }
                            StreamKind::Stdout => {}
                        }
                        on_line(kind, &line);
                    }
                    None => streams_open = false,
                },
                status = child.wait(), if !streams_open => {
                    break status.map_err(|e| {
                        vf_core::Error::tool(
                            program_name.clone(),
                            format!("I/O error waiting for process: {e}"),
                        )
                    })?;
                }
                () = &mut cancelled => {
                    tracing::info!(tool = %program_name, "cancelling");
                    terminate(&mut child, self.kill_grace).await;
                    return Err(vf_core::Error::Cancelled(program_name));
                }
                () = &mut deadline => {
                    terminate(&mut child, self.kill_grace).await;
                    return Err(vf_core::Error::tool(
                        program_name,
                        format!("timed out after {:?}", self.timeout),
                    ));
                }
            }
        };

        let stderr = stderr_tail.join("\n");
        if !status.success() {
            return Err(vf_core::Error::tool(
                program_name,
                format!("exited with status {status}: {}", stderr.trim()),
            ));
        }

        Ok(ToolOutput {
            status,
            stdout,
            stderr,
        })
    }
}

async fn forward_lines<R>(pipe: R, kind: StreamKind, tx: mpsc::Sender<(StreamKind, String)>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    let mut after_cr = false;
    while let Ok(Some((line, terminator))) = read_segment(&mut reader, &mut buf).await {
        // `\r\n` is one line ending, not two.
        let skip = after_cr && line.is_empty() && terminator == Some(b'\n');
        after_cr = terminator == Some(b'\r');
        if skip {
            continue;
        }
        if tx.send((kind, line)).await.is_err() {
            break;
        }
    }
}

/// Read up to the next `\n` or `\r`, returning the segment and the byte
/// that ended it. Returns `None` once the stream is exhausted.
async fn read_segment<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<(String, Option<u8>)>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if buf.is_empty() {
                return Ok(None);
            }
            let line = String::from_utf8_lossy(buf).into_owned();
            buf.clear();
            return Ok(Some((line, None)));
        }
        match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(i) => {
                let terminator = available[i];
                buf.extend_from_slice(&available[..i]);
                reader.consume(i + 1);
                let line = String::from_utf8_lossy(buf).into_owned();
                buf.clear();
                return Ok(Some((line, Some(terminator))));
            }
            None => {
                let n = available.len();
                buf.extend_from_slice(available);
                reader.consume(n);
            }
        }
    }
}

/// Ask the child to stop, then kill it if it ignores us.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(pid) {
            if kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(grace, child.wait()).await.is_ok()
            {
                return;
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        tracing::debug!("kill failed: {e}");
    }
}
