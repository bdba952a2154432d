//! Progress, step and message emission.
//!
//! A [`Reporter`] owns the process's stdout (or any writer handed to it) and
//! renders every [`LogEvent`] in one of three shapes:
//!
//! * JSON lines (`["progress",{...}]`), the default when stdout is not a TTY
//! * legacy text lines (`PROGRESS: file: 42%`)
//! * human rendering: indicatif bars on a terminal, append-only
//!   `file: 42%` lines otherwise
//!
//! Whole lines are written under a single lock so concurrent emitters never
//! interleave within a line.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use vf_core::config::ReportFormat;

use crate::events::{format_percent, LogEvent, LogKind, ProgressEvent, ProgressStatus, StepEvent};

/// Concrete rendering selected once a [`ReportFormat`] meets a real writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// In-place terminal bars.
    Interactive,
    /// Append-only human lines.
    Lines,
    /// Legacy `TYPE: message` lines.
    Text,
    /// `[type, payload]` JSON lines.
    Json,
}

impl RenderMode {
    /// Resolve a configured format against whether the sink is a terminal.
    pub fn resolve(format: ReportFormat, is_terminal: bool) -> Self {
        match (format, is_terminal) {
            (ReportFormat::Auto, true) | (ReportFormat::Human, true) => RenderMode::Interactive,
            (ReportFormat::Auto, false) => RenderMode::Json,
            (ReportFormat::Human, false) => RenderMode::Lines,
            (ReportFormat::Text, _) => RenderMode::Text,
            (ReportFormat::Json, _) => RenderMode::Json,
        }
    }

    /// Whether the output is meant to be machine parsed.
    pub fn is_wire(self) -> bool {
        matches!(self, RenderMode::Text | RenderMode::Json)
    }
}

struct Inner {
    mode: RenderMode,
    sink: Mutex<Box<dyn Write + Send>>,
    bars: Option<MultiProgress>,
}

/// Cheaply cloneable handle to the process-wide event sink.
#[derive(Clone)]
pub struct Reporter {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("mode", &self.inner.mode).finish()
    }
}

impl Reporter {
    /// Reporter writing to stdout.
    pub fn stdout(format: ReportFormat) -> Self {
        let mode = RenderMode::resolve(format, io::stdout().is_terminal());
        let bars = (mode == RenderMode::Interactive)
            .then(|| MultiProgress::with_draw_target(ProgressDrawTarget::stdout()));
        Self {
            inner: Arc::new(Inner {
                mode,
                sink: Mutex::new(Box::new(io::stdout())),
                bars,
            }),
        }
    }

    /// Reporter writing to an arbitrary sink. The sink is never treated as a
    /// terminal, so `Human` renders append-only lines.
    pub fn with_writer<W>(format: ReportFormat, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                mode: RenderMode::resolve(format, false),
                sink: Mutex::new(Box::new(writer)),
                bars: None,
            }),
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.inner.mode
    }

    /// Render one event.
    pub fn emit(&self, event: &LogEvent) {
        let line = match self.inner.mode {
            RenderMode::Json => Some(event.to_json_line()),
            RenderMode::Text => Some(event.to_text_line()),
            RenderMode::Lines | RenderMode::Interactive => human_line(event),
        };
        if let Some(line) = line {
            self.write_line(&line);
        }
    }

    pub fn message(&self, kind: LogKind, message: impl Into<String>) {
        self.emit(&LogEvent::message(kind, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.message(LogKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.message(LogKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.message(LogKind::Error, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.message(LogKind::Debug, message);
    }

    /// Emit a step transition for `file`.
    pub fn step(
        &self,
        index: usize,
        process: &str,
        file: &str,
        status: ProgressStatus,
    ) {
        self.emit(&LogEvent::Step(StepEvent::new(index, process, file, status)));
    }

    /// Begin tracking progress for `file` and emit its starting state.
    pub fn progress(&self, file: impl Into<String>) -> Progress {
        let file = file.into();
        let bar = self.inner.bars.as_ref().map(|multi| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(bar_style("{msg}: {pos}%"));
            bar.set_message(file.clone());
            bar
        });
        let progress = Progress {
            reporter: self.clone(),
            file,
            bar,
            last: Some(0),
            finished: false,
        };
        progress.render(ProgressEvent::new(progress.file.clone(), Some(0.0)));
        progress
    }

    fn write_line(&self, line: &str) {
        if let Some(multi) = &self.inner.bars {
            let _ = multi.println(line);
            return;
        }
        let mut sink = self.inner.sink.lock();
        // A closed pipe means the supervisor went away; nothing left to tell.
        let _ = writeln!(sink, "{line}").and_then(|()| sink.flush());
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn human_line(event: &LogEvent) -> Option<String> {
    match event {
        LogEvent::Error(m) => Some(format!("error: {m}")),
        LogEvent::Info(m) | LogEvent::Success(m) => Some(m.clone()),
        LogEvent::Debug(_) => None,
        LogEvent::Progress(p) => Some(match p.status {
            ProgressStatus::Done => format!("{}: Complete", p.file),
            ProgressStatus::Error => format!("{}: ERROR", p.file),
            ProgressStatus::Queued | ProgressStatus::Working => {
                format!("{}: {}%", p.file, format_percent(p.percent.unwrap_or(0.0).floor()))
            }
        }),
        LogEvent::Step(s) => match s.status {
            ProgressStatus::Working => Some(format!("{} [{}] {}", s.file, s.index, s.process)),
            ProgressStatus::Error => Some(format!("{} [{}] {} failed", s.file, s.index, s.process)),
            ProgressStatus::Queued | ProgressStatus::Done => None,
        },
    }
}

/// Progress of one named operation.
///
/// Updates that do not move the whole-number percentage are dropped. The
/// handle is finished by [`Progress::stop`], [`Progress::fail`], or an
/// `update` reaching 100.
pub struct Progress {
    reporter: Reporter,
    file: String,
    bar: Option<ProgressBar>,
    last: Option<i64>,
    finished: bool,
}

impl Progress {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Report a new percentage. `None` means the tool has not reported one
    /// yet. Reaching 100 finishes the operation.
    pub fn update(&mut self, percent: Option<f64>) {
        if self.finished {
            return;
        }
        let Some(percent) = percent else {
            return;
        };
        if percent >= 100.0 {
            self.stop();
            return;
        }
        let percent = percent.max(0.0);
        let whole = percent.floor() as i64;
        if self.last == Some(whole) {
            return;
        }
        self.last = Some(whole);
        self.render(ProgressEvent::new(self.file.clone(), Some(percent)));
    }

    /// Mark the operation complete.
    pub fn stop(&mut self) {
        if std::mem::replace(&mut self.finished, true) {
            return;
        }
        self.render(ProgressEvent::new(self.file.clone(), Some(100.0)));
    }

    /// Mark the operation failed.
    pub fn fail(&mut self) {
        if std::mem::replace(&mut self.finished, true) {
            return;
        }
        self.render(ProgressEvent::error(self.file.clone()));
    }

    fn render(&self, event: ProgressEvent) {
        match &self.bar {
            Some(bar) => match event.status {
                ProgressStatus::Done => {
                    bar.set_style(bar_style("{msg}: Complete"));
                    bar.finish();
                }
                ProgressStatus::Error => {
                    bar.set_style(bar_style("{msg}: ERROR"));
                    bar.abandon();
                }
                ProgressStatus::Queued | ProgressStatus::Working => {
                    bar.set_position(event.percent.unwrap_or(0.0) as u64);
                }
            },
            None => self.reporter.emit(&LogEvent::Progress(event)),
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if let (Some(bar), false) = (&self.bar, self.finished) {
            bar.abandon();
        }
    }
}

/// In-memory sink, shared between clones. Handy for capturing reporter
/// output in tests and for buffering child output.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter(Arc<Mutex<Vec<u8>>>);

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
