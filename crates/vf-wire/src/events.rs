//! Wire event types.
//!
//! A [`LogEvent`] is the only record that crosses the worker/supervisor
//! process boundary. It has two line encodings: the JSON array
//! `["progress", {...}]` produced by [`LogEvent::to_json_line`] and the legacy
//! plain-text `PROGRESS: file: 42%` produced by [`LogEvent::to_text_line`].
//! [`crate::parse`] accepts both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// ProgressStatus
// ---------------------------------------------------------------------------

/// Coarse state of a progress-tracked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    Queued,
    Working,
    Done,
    Error,
}

impl ProgressStatus {
    /// Infer a status from a percentage.
    ///
    /// `>= 100` is done, `(0, 100)` is working, absent or `0` is queued and a
    /// negative (or NaN) sentinel is an error.
    pub fn infer(percent: Option<f64>) -> Self {
        match percent {
            Some(p) if p.is_nan() || p < 0.0 => ProgressStatus::Error,
            Some(p) if p >= 100.0 => ProgressStatus::Done,
            Some(p) if p > 0.0 => ProgressStatus::Working,
            _ => ProgressStatus::Queued,
        }
    }

    /// Whether no further updates are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStatus::Done | ProgressStatus::Error)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgressStatus::Queued => "Queued",
            ProgressStatus::Working => "Working",
            ProgressStatus::Done => "Done",
            ProgressStatus::Error => "Error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ProgressEvent / StepEvent
// ---------------------------------------------------------------------------

/// Progress of one operation. `file` names the file being produced or
/// processed; it never contains `:` when sent in plain-text form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub status: ProgressStatus,
}

impl ProgressEvent {
    /// Build an event whose status is inferred from `percent`.
    pub fn new(file: impl Into<String>, percent: Option<f64>) -> Self {
        Self {
            file: file.into(),
            percent,
            status: ProgressStatus::infer(percent),
        }
    }

    /// Build a terminal error event.
    pub fn error(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            percent: Some(0.0),
            status: ProgressStatus::Error,
        }
    }
}

/// Marks which pipeline stage is active for a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepEvent {
    /// 1-based position of the stage in the pipeline.
    pub index: usize,
    /// Stage name.
    pub process: String,
    pub file: String,
    pub percent: f64,
    pub status: ProgressStatus,
}

impl StepEvent {
    pub fn new(
        index: usize,
        process: impl Into<String>,
        file: impl Into<String>,
        status: ProgressStatus,
    ) -> Self {
        let percent = if status == ProgressStatus::Done { 100.0 } else { 0.0 };
        Self {
            index,
            process: process.into(),
            file: file.into(),
            percent,
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// LogKind / LogEvent
// ---------------------------------------------------------------------------

/// Discriminant of a [`LogEvent`], as written in the wire `type` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Error,
    Info,
    Debug,
    Success,
    Progress,
    Step,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Error => "error",
            LogKind::Info => "info",
            LogKind::Debug => "debug",
            LogKind::Success => "success",
            LogKind::Progress => "progress",
            LogKind::Step => "step",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogKind::Error),
            "info" => Ok(LogKind::Info),
            "debug" => Ok(LogKind::Debug),
            "success" => Ok(LogKind::Success),
            "progress" => Ok(LogKind::Progress),
            "step" => Ok(LogKind::Step),
            _ => Err(()),
        }
    }
}

/// One wire record.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Error(String),
    Info(String),
    Debug(String),
    Success(String),
    Progress(ProgressEvent),
    Step(StepEvent),
}

impl LogEvent {
    /// Build a message event of the given kind. Non-message kinds fall back
    /// to [`LogEvent::Debug`].
    pub fn message(kind: LogKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            LogKind::Error => LogEvent::Error(message),
            LogKind::Info => LogEvent::Info(message),
            LogKind::Success => LogEvent::Success(message),
            LogKind::Debug | LogKind::Progress | LogKind::Step => LogEvent::Debug(message),
        }
    }

    pub fn kind(&self) -> LogKind {
        match self {
            LogEvent::Error(_) => LogKind::Error,
            LogEvent::Info(_) => LogKind::Info,
            LogEvent::Debug(_) => LogKind::Debug,
            LogEvent::Success(_) => LogKind::Success,
            LogEvent::Progress(_) => LogKind::Progress,
            LogEvent::Step(_) => LogKind::Step,
        }
    }

    /// The message text, for message events.
    pub fn text(&self) -> Option<&str> {
        match self {
            LogEvent::Error(m) | LogEvent::Info(m) | LogEvent::Debug(m) | LogEvent::Success(m) => {
                Some(m)
            }
            LogEvent::Progress(_) | LogEvent::Step(_) => None,
        }
    }

    /// Encode as a `[type, payload]` JSON line (without trailing newline).
    pub fn to_json_line(&self) -> String {
        let payload = match self {
            LogEvent::Error(m) | LogEvent::Info(m) | LogEvent::Debug(m) | LogEvent::Success(m) => {
                Value::String(m.clone())
            }
            LogEvent::Progress(p) => serde_json::to_value(p).unwrap_or(Value::Null),
            LogEvent::Step(s) => serde_json::to_value(s).unwrap_or(Value::Null),
        };
        json!([self.kind().as_str(), payload]).to_string()
    }

    /// Encode as a legacy plain-text line (without trailing newline).
    pub fn to_text_line(&self) -> String {
        match self {
            LogEvent::Error(m) => format!("ERROR: {}", single_line(m)),
            LogEvent::Info(m) => format!("INFO: {}", single_line(m)),
            LogEvent::Debug(m) => format!("DEBUG: {}", single_line(m)),
            LogEvent::Success(m) => format!("SUCCESS: {}", single_line(m)),
            LogEvent::Progress(p) => {
                let file = p.file.replace(':', "_");
                if p.status == ProgressStatus::Error {
                    format!("PROGRESS: {file}: ERROR")
                } else {
                    format!("PROGRESS: {file}: {}%", format_percent(p.percent.unwrap_or(0.0)))
                }
            }
            LogEvent::Step(s) => {
                let body = json!({
                    "process": s.process,
                    "file": s.file,
                    "percent": s.percent,
                    "status": s.status,
                });
                format!("STEP@{}: {body}", s.index)
            }
        }
    }
}

/// Render a percentage without trailing zeros (`42`, `42.5`).
pub fn format_percent(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("{p:.0}")
    } else {
        let s = format!("{p:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}
