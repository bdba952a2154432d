//! Supervisor-side queue model.
//!
//! [`QueueMonitor`] folds a parsed event stream back into per-file state.
//! A worker announces each file with a file-level progress event (its
//! `file` is the queued filename) before any step starts; progress events
//! that arrive while a step is working belong to that step's artifacts,
//! whatever their name. Views are kept per occurrence: a file-level
//! `Queued` event after a finished view of the same name opens a new one.

use crate::events::{LogEvent, ProgressEvent, ProgressStatus, StepEvent};

/// State of one stage as seen from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub index: usize,
    pub process: String,
    pub status: ProgressStatus,
}

/// State of one queued file as seen from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FileView {
    pub file: String,
    pub percent: Option<f64>,
    pub status: ProgressStatus,
    pub steps: Vec<StepView>,
    /// Latest progress per artifact, in first-seen order.
    pub artifacts: Vec<ProgressEvent>,
    pub last_error: Option<String>,
}

impl FileView {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            percent: None,
            status: ProgressStatus::Queued,
            steps: Vec::new(),
            artifacts: Vec::new(),
            last_error: None,
        }
    }

    /// The step currently marked working, if any.
    pub fn current_step(&self) -> Option<&StepView> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.status == ProgressStatus::Working)
    }

    /// Latest progress recorded for an artifact.
    pub fn artifact(&self, name: &str) -> Option<&ProgressEvent> {
        self.artifacts.iter().find(|a| a.file == name)
    }

    fn apply_step(&mut self, step: &StepEvent) {
        match self.steps.iter_mut().find(|s| s.index == step.index) {
            Some(view) => {
                view.status = step.status;
                view.process.clone_from(&step.process);
            }
            None => self.steps.push(StepView {
                index: step.index,
                process: step.process.clone(),
                status: step.status,
            }),
        }
        if self.status == ProgressStatus::Queued {
            self.status = ProgressStatus::Working;
        }
    }

    fn apply_artifact(&mut self, progress: &ProgressEvent) {
        match self.artifacts.iter_mut().find(|a| a.file == progress.file) {
            Some(slot) => *slot = progress.clone(),
            None => self.artifacts.push(progress.clone()),
        }
    }
}

/// Per-file state reconstructed from a worker's event stream.
#[derive(Debug, Default)]
pub struct QueueMonitor {
    files: Vec<FileView>,
    current: Option<usize>,
    completed: usize,
    failed: usize,
    /// Errors that arrived while no file was active.
    orphan_errors: Vec<String>,
}

impl QueueMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[FileView] {
        &self.files
    }

    /// Latest view of the file named `name`.
    pub fn file(&self, name: &str) -> Option<&FileView> {
        self.files.iter().rev().find(|f| f.file == name)
    }

    pub fn current(&self) -> Option<&FileView> {
        self.current.and_then(|i| self.files.get(i))
    }

    /// Files that reached `Done`.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Files that reached `Error`.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn orphan_errors(&self) -> &[String] {
        &self.orphan_errors
    }

    /// Fold one event into the model.
    pub fn apply(&mut self, event: &LogEvent) {
        match event {
            LogEvent::Step(step) => {
                let idx = self.view_for_step(&step.file);
                self.files[idx].apply_step(step);
                self.current = Some(idx);
            }
            LogEvent::Progress(progress) => self.apply_progress(progress),
            LogEvent::Error(message) => match self.current.and_then(|i| self.files.get_mut(i)) {
                Some(file) => file.last_error = Some(message.clone()),
                None => self.orphan_errors.push(message.clone()),
            },
            LogEvent::Info(_) | LogEvent::Debug(_) | LogEvent::Success(_) => {}
        }
    }

    fn apply_progress(&mut self, progress: &ProgressEvent) {
        let active_step = self
            .current()
            .is_some_and(|f| f.current_step().is_some());

        if active_step {
            if let Some(file) = self.current.and_then(|i| self.files.get_mut(i)) {
                file.apply_artifact(progress);
            }
            return;
        }

        let idx = match self.latest(&progress.file) {
            Some(idx)
                if !(progress.status == ProgressStatus::Queued
                    && self.files[idx].status.is_terminal()) =>
            {
                idx
            }
            _ => self.push_view(&progress.file),
        };
        self.apply_file_progress(idx, progress);
    }

    fn apply_file_progress(&mut self, idx: usize, progress: &ProgressEvent) {
        let file = &mut self.files[idx];
        let was_terminal = file.status.is_terminal();
        file.percent = progress.percent;
        file.status = progress.status;
        self.current = Some(idx);

        if !was_terminal {
            match progress.status {
                ProgressStatus::Done => self.completed += 1,
                ProgressStatus::Error => self.failed += 1,
                ProgressStatus::Queued | ProgressStatus::Working => {}
            }
        }
    }

    /// The current view when it carries `name`, else the latest one.
    fn view_for_step(&mut self, name: &str) -> usize {
        match self.current {
            Some(idx) if self.files[idx].file == name => idx,
            _ => match self.latest(name) {
                Some(idx) => idx,
                None => self.push_view(name),
            },
        }
    }

    fn latest(&self, name: &str) -> Option<usize> {
        self.files.iter().rposition(|f| f.file == name)
    }

    fn push_view(&mut self, name: &str) -> usize {
        self.files.push(FileView::new(name));
        self.files.len() - 1
    }
}
