//! Wire line parser.
//!
//! [`parse`] is total: every input line becomes exactly one [`LogEvent`].
//! A leading `[` selects the JSON decoder; anything else goes through the
//! plain-text prefix classifier. Lines that look structured but cannot be
//! decoded come back as [`LogEvent::Error`] carrying the raw line.

use serde::Deserialize;
use serde_json::Value;

use crate::events::{LogEvent, LogKind, ProgressEvent, ProgressStatus, StepEvent};

/// Decode one line read from a worker's stdout.
pub fn parse(line: &str) -> LogEvent {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim_start().starts_with('[') {
        return parse_json(line).unwrap_or_else(|| LogEvent::Error(line.to_string()));
    }
    parse_text(line)
}

/// Decode one line read from a worker's stderr. Everything on stderr is an
/// error as far as the supervisor is concerned.
pub fn parse_stderr(line: &str) -> LogEvent {
    LogEvent::Error(line.trim_end_matches(['\r', '\n']).to_string())
}

// ---------------------------------------------------------------------------
// JSON encoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawProgress {
    #[serde(default)]
    file: String,
    #[serde(default)]
    percent: Option<f64>,
    #[serde(default)]
    status: Option<ProgressStatus>,
}

impl From<RawProgress> for ProgressEvent {
    fn from(raw: RawProgress) -> Self {
        let status = raw
            .status
            .unwrap_or_else(|| ProgressStatus::infer(raw.percent));
        ProgressEvent {
            file: raw.file,
            percent: raw.percent,
            status,
        }
    }
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    process: String,
    #[serde(default)]
    file: String,
    #[serde(default)]
    percent: Option<f64>,
    #[serde(default)]
    status: Option<ProgressStatus>,
}

impl RawStep {
    fn into_event(self, index: usize) -> StepEvent {
        StepEvent {
            index: self.index.unwrap_or(index),
            process: self.process,
            file: self.file,
            percent: self.percent.unwrap_or(0.0),
            status: self.status.unwrap_or(ProgressStatus::Queued),
        }
    }
}

fn parse_json(line: &str) -> Option<LogEvent> {
    let (kind, payload): (String, Value) = serde_json::from_str(line).ok()?;

    match kind.parse::<LogKind>() {
        Ok(LogKind::Progress) => {
            let raw: RawProgress = serde_json::from_value(payload).ok()?;
            Some(LogEvent::Progress(raw.into()))
        }
        Ok(LogKind::Step) => {
            let raw: RawStep = serde_json::from_value(payload).ok()?;
            Some(LogEvent::Step(raw.into_event(0)))
        }
        Ok(kind) => Some(LogEvent::message(kind, payload_text(payload))),
        Err(()) => Some(LogEvent::Debug(payload_text(payload))),
    }
}

fn payload_text(payload: Value) -> String {
    match payload {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Plain-text encoding
// ---------------------------------------------------------------------------

/// Prefixes in classification priority order.
const PREFIXES: [(&str, LogKind); 5] = [
    ("error:", LogKind::Error),
    ("info:", LogKind::Info),
    ("success:", LogKind::Success),
    ("progress:", LogKind::Progress),
    ("debug:", LogKind::Debug),
];

fn parse_text(line: &str) -> LogEvent {
    let lowered = line.to_ascii_lowercase();

    if lowered.starts_with("step@") {
        return parse_step_text(line).unwrap_or_else(|| LogEvent::Error(line.to_string()));
    }

    let (kind, rest) = PREFIXES
        .iter()
        .find(|(prefix, _)| lowered.starts_with(prefix))
        .map(|(prefix, kind)| (*kind, &line[prefix.len()..]))
        .unwrap_or((LogKind::Debug, line));

    let message = rest.replacen("Error: ", "", 1);
    let message = message.trim();

    if kind == LogKind::Progress {
        return LogEvent::Progress(parse_progress_text(message));
    }
    LogEvent::message(kind, message)
}

fn parse_progress_text(message: &str) -> ProgressEvent {
    let Some((file, pct)) = message.split_once(':') else {
        return ProgressEvent::error(message.trim());
    };
    let file = file.trim();
    let pct = pct.trim();
    if pct.is_empty() || pct.eq_ignore_ascii_case("error") {
        return ProgressEvent::error(file);
    }
    match pct.trim_end_matches('%').trim().parse::<f64>() {
        Ok(percent) => ProgressEvent::new(file, Some(percent)),
        Err(_) => ProgressEvent::error(file),
    }
}

fn parse_step_text(line: &str) -> Option<LogEvent> {
    let (head, body) = line.split_once(':')?;
    let index: usize = head.get("step@".len()..)?.trim().parse().ok()?;
    let raw: RawStep = serde_json::from_str(body.trim()).ok()?;
    Some(LogEvent::Step(raw.into_event(index)))
}
