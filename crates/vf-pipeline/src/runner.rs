//! Pipeline runner: walks the file queue, running the enabled stages for
//! each file in order, with step reporting and cooperative cancellation.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use vf_av::ToolRegistry;
use vf_core::Config;
use vf_wire::{ProgressStatus, Reporter};

use crate::artifacts::Artifacts;
use crate::context::StageContext;
use crate::queue::{FileQueue, FileState, QueuedFile};
use crate::stage::Stage;
use crate::stages::default_stages;

/// Out-of-band control over a running [`Runner`].
///
/// Cloneable and usable from signal handlers on other tasks.
#[derive(Debug, Clone, Default)]
pub struct RunnerHandle {
    run: CancellationToken,
    stage: Arc<Mutex<Option<CancellationToken>>>,
}

impl RunnerHandle {
    /// Stop the active tool and schedule no further work. Finalizer stages
    /// of the current file still run.
    pub fn cancel(&self) {
        self.run.cancel();
    }

    /// Stop only the active tool. The current stage yields nothing and the
    /// runner moves on to the next one.
    pub fn skip_stage(&self) {
        if let Some(token) = self.stage.lock().as_ref() {
            token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }

    fn begin_stage(&self, finalizer: bool) -> CancellationToken {
        // Finalizers must not inherit an already-cancelled run token.
        let token = if finalizer {
            CancellationToken::new()
        } else {
            self.run.child_token()
        };
        *self.stage.lock() = Some(token.clone());
        token
    }

    fn end_stage(&self) {
        *self.stage.lock() = None;
    }
}

/// Outcome for one queued file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub state: FileState,
    pub artifacts: Artifacts,
    /// Stages that ran and failed.
    pub failed_stages: Vec<String>,
}

/// Results of a whole batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
    /// Files that reached [`FileState::Done`].
    pub completed: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Runs the stage list over a [`FileQueue`].
///
/// Files are processed strictly one after another and stages within a file
/// in list order. A failing stage is logged and the next one runs. A file
/// is `Failed` when its folder could not be created, when every regular
/// stage it ran failed, or when a cancel cut its stages short. Finalizers
/// do not count towards the outcome.
pub struct Runner {
    config: Config,
    tools: ToolRegistry,
    reporter: Reporter,
    stages: Vec<Box<dyn Stage>>,
    handle: RunnerHandle,
}

impl Runner {
    /// Create a runner with the built-in stage list.
    ///
    /// # Errors
    ///
    /// [`vf_core::Error::Argument`] when no output destination is configured.
    pub fn new(config: Config, tools: ToolRegistry, reporter: Reporter) -> vf_core::Result<Self> {
        config.require_output()?;
        Ok(Self {
            config,
            tools,
            reporter,
            stages: default_stages(),
            handle: RunnerHandle::default(),
        })
    }

    /// Builder: replace the stage list.
    pub fn with_stages(mut self, stages: Vec<Box<dyn Stage>>) -> Self {
        self.stages = stages;
        self
    }

    pub fn handle(&self) -> RunnerHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every file in `queue`, updating each entry's state.
    pub async fn run(&self, queue: &mut FileQueue) -> vf_core::Result<RunSummary> {
        let output = self.config.require_output()?.to_path_buf();
        let mut summary = RunSummary::default();

        for file in queue.iter_mut() {
            if self.handle.is_cancelled() {
                tracing::warn!("Run cancelled; {} left queued", file.filename);
                summary.cancelled = true;
                continue;
            }

            let report = self.run_file(file, &output).await;
            match report.state {
                FileState::Done => summary.completed += 1,
                FileState::Failed => summary.failed += 1,
                FileState::Queued | FileState::Running => {}
            }
            tracing::debug!(completed = summary.completed, "Finished {}", file.filename);
            summary.files.push(report);
        }

        summary.cancelled |= self.handle.is_cancelled();
        Ok(summary)
    }

    async fn run_file(&self, file: &mut QueuedFile, output: &std::path::Path) -> FileReport {
        let destination = file.destination(output);
        let mut file_progress = self.reporter.progress(file.filename.as_str());
        file.state = FileState::Running;

        let mut report = FileReport {
            source: file.source.clone(),
            destination: destination.clone(),
            state: FileState::Running,
            artifacts: Artifacts::default(),
            failed_stages: Vec::new(),
        };

        if let Err(e) = tokio::fs::create_dir_all(&destination).await {
            tracing::error!(file = %file.filename, "Cannot create {:?}: {e}", destination);
            file_progress.fail();
            file.state = FileState::Failed;
            report.state = FileState::Failed;
            return report;
        }

        let probe = OnceCell::new();
        let current: &QueuedFile = file;
        let mut ran = 0usize;
        let mut failed = 0usize;
        let mut interrupted = false;

        for (i, stage) in self.stages.iter().enumerate() {
            let index = i + 1;
            let name = stage.name();
            let finalizer = stage.finalizer();

            if !stage.enabled(&self.config) {
                continue;
            }
            if self.handle.is_cancelled() && !finalizer {
                tracing::debug!(stage = name, "Cancelled; not starting");
                interrupted = true;
                continue;
            }
            if let Some(reason) = stage.requires(&report.artifacts) {
                tracing::error!(file = %current.filename, stage = name, "Skipping {name}, {reason}");
                continue;
            }

            self.reporter
                .step(index, name, &current.filename, ProgressStatus::Working);
            let token = self.handle.begin_stage(finalizer);
            let ctx = StageContext::new(
                current,
                destination.clone(),
                &self.config,
                &self.tools,
                &self.reporter,
                &probe,
            )
            .with_cancellation(token);

            let result = stage.run(&ctx, &mut report.artifacts).await;
            self.handle.end_stage();
            if !finalizer {
                ran += 1;
            }

            match result {
                Ok(()) => {
                    self.reporter
                        .step(index, name, &current.filename, ProgressStatus::Done);
                }
                Err(e) => {
                    if e.is_cancelled() && self.handle.is_cancelled() {
                        interrupted = true;
                    }
                    if !finalizer {
                        failed += 1;
                    }
                    if e.is_cancelled() {
                        tracing::warn!(file = %current.filename, stage = name, "Stage cancelled");
                    } else {
                        tracing::error!(file = %current.filename, stage = name, "{e}");
                    }
                    self.reporter
                        .step(index, name, &current.filename, ProgressStatus::Error);
                    report.failed_stages.push(name.to_string());
                }
            }
        }

        let state = if interrupted || (ran > 0 && failed == ran) {
            file_progress.fail();
            FileState::Failed
        } else {
            file_progress.stop();
            tracing::info!(success = true, "Completed {}", current.filename);
            FileState::Done
        };
        file.state = state;
        report.state = state;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vf_core::config::ReportFormat;
    use vf_wire::{LogEvent, MemoryWriter, StepEvent};

    // -- Fake stages ----------------------------------------------------------

    struct FakeOk {
        name: &'static str,
        executed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Stage for FakeOk {
        fn name(&self) -> &'static str {
            self.name
        }
        fn enabled(&self, _config: &Config) -> bool {
            true
        }
        async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            artifacts.compressed = Some(ctx.output("video.mp4"));
            Ok(())
        }
    }

    struct FakeFail;

    #[async_trait]
    impl Stage for FakeFail {
        fn name(&self) -> &'static str {
            "boom"
        }
        fn enabled(&self, _config: &Config) -> bool {
            true
        }
        async fn run(&self, _ctx: &StageContext<'_>, _artifacts: &mut Artifacts) -> vf_core::Result<()> {
            Err(vf_core::Error::pipeline("boom", "intentional failure"))
        }
    }

    struct Disabled;

    #[async_trait]
    impl Stage for Disabled {
        fn name(&self) -> &'static str {
            "disabled"
        }
        fn enabled(&self, _config: &Config) -> bool {
            false
        }
        async fn run(&self, _ctx: &StageContext<'_>, _artifacts: &mut Artifacts) -> vf_core::Result<()> {
            unreachable!()
        }
    }

    struct NeedsAudio;

    #[async_trait]
    impl Stage for NeedsAudio {
        fn name(&self) -> &'static str {
            "needs-audio"
        }
        fn enabled(&self, _config: &Config) -> bool {
            true
        }
        fn requires(&self, artifacts: &Artifacts) -> Option<&'static str> {
            artifacts.audio.is_none().then_some("no audio file was generated")
        }
        async fn run(&self, _ctx: &StageContext<'_>, _artifacts: &mut Artifacts) -> vf_core::Result<()> {
            unreachable!()
        }
    }

    /// Waits for cancellation, then reports it.
    struct Blocking;

    #[async_trait]
    impl Stage for Blocking {
        fn name(&self) -> &'static str {
            "blocking"
        }
        fn enabled(&self, _config: &Config) -> bool {
            true
        }
        async fn run(&self, ctx: &StageContext<'_>, _artifacts: &mut Artifacts) -> vf_core::Result<()> {
            ctx.cancel.cancelled().await;
            Err(vf_core::Error::Cancelled("blocking".into()))
        }
    }

    struct Finalizer(Arc<AtomicUsize>);

    #[async_trait]
    impl Stage for Finalizer {
        fn name(&self) -> &'static str {
            "finalizer"
        }
        fn enabled(&self, _config: &Config) -> bool {
            true
        }
        fn finalizer(&self) -> bool {
            true
        }
        async fn run(&self, ctx: &StageContext<'_>, _artifacts: &mut Artifacts) -> vf_core::Result<()> {
            assert!(!ctx.cancel.is_cancelled());
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    // -- Helpers --------------------------------------------------------------

    struct Setup {
        dir: tempfile::TempDir,
        out: MemoryWriter,
        runner: Runner,
    }

    fn setup(stages: Vec<Box<dyn Stage>>) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let out = MemoryWriter::new();
        let config = Config {
            output: Some(dir.path().join("out")),
            use_unique_name: false,
            ..Config::default()
        };
        let reporter = Reporter::with_writer(ReportFormat::Json, out.clone());
        let runner = Runner::new(config, ToolRegistry::default(), reporter)
            .unwrap()
            .with_stages(stages);
        Setup { dir, out, runner }
    }

    fn steps(out: &MemoryWriter) -> Vec<StepEvent> {
        out.lines()
            .iter()
            .filter_map(|l| match vf_wire::parse(l) {
                LogEvent::Step(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    // -- Tests ----------------------------------------------------------------

    #[test]
    fn missing_output_is_fatal() {
        let err = Runner::new(
            Config::default(),
            ToolRegistry::default(),
            Reporter::with_writer(ReportFormat::Json, MemoryWriter::new()),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("output destination"));
    }

    #[tokio::test]
    async fn runs_stages_per_file_and_creates_folders() {
        let c = counter();
        let s = setup(vec![Box::new(FakeOk { name: "a", executed: c.clone() })]);
        let mut queue = FileQueue::create(["/in/one.mp4", "/in/two.mkv"], false);

        let summary = s.runner.run(&mut queue).await.unwrap();

        assert_eq!(c.load(Ordering::SeqCst), 2);
        assert_eq!(summary.completed, 2);
        assert!(s.dir.path().join("out/one").is_dir());
        assert!(s.dir.path().join("out/two").is_dir());
        assert!(queue.iter().all(|f| f.state == FileState::Done));
        assert_eq!(
            summary.files[0].artifacts.compressed,
            Some(s.dir.path().join("out/one/video.mp4"))
        );
    }

    #[tokio::test]
    async fn step_indices_count_disabled_stages() {
        let c = counter();
        let s = setup(vec![
            Box::new(Disabled),
            Box::new(FakeOk { name: "second", executed: c.clone() }),
        ]);
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);
        s.runner.run(&mut queue).await.unwrap();

        let steps = steps(&s.out);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].index, 2);
        assert_eq!(steps[0].process, "second");
        assert_eq!(steps[0].file, "movie.mp4");
        assert_eq!(steps[0].status, ProgressStatus::Working);
        assert_eq!(steps[1].status, ProgressStatus::Done);
    }

    #[tokio::test]
    async fn file_progress_brackets_the_steps() {
        let c = counter();
        let s = setup(vec![Box::new(FakeOk { name: "a", executed: c })]);
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);
        s.runner.run(&mut queue).await.unwrap();

        let events: Vec<LogEvent> = s.out.lines().iter().map(|l| vf_wire::parse(l)).collect();
        assert!(matches!(&events[0], LogEvent::Progress(p) if p.file == "movie.mp4" && p.status == ProgressStatus::Queued));
        assert!(matches!(events.last().unwrap(), LogEvent::Progress(p) if p.file == "movie.mp4" && p.status == ProgressStatus::Done));
    }

    #[tokio::test]
    async fn failures_are_contained() {
        let c = counter();
        let s = setup(vec![
            Box::new(FakeFail),
            Box::new(FakeOk { name: "after", executed: c.clone() }),
        ]);
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);
        let summary = s.runner.run(&mut queue).await.unwrap();

        assert_eq!(c.load(Ordering::SeqCst), 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.files[0].failed_stages, ["boom"]);
        let statuses: Vec<ProgressStatus> = steps(&s.out).iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            [
                ProgressStatus::Working,
                ProgressStatus::Error,
                ProgressStatus::Working,
                ProgressStatus::Done
            ]
        );
    }

    #[tokio::test]
    async fn every_stage_failing_fails_the_file() {
        let s = setup(vec![Box::new(FakeFail)]);
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);
        let summary = s.runner.run(&mut queue).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(queue.iter().next().unwrap().state, FileState::Failed);
    }

    #[tokio::test]
    async fn missing_prerequisite_skips_without_a_step() {
        let s = setup(vec![Box::new(NeedsAudio)]);
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);
        let summary = s.runner.run(&mut queue).await.unwrap();
        assert!(steps(&s.out).is_empty());
        assert_eq!(summary.completed, 1);
    }

    #[tokio::test]
    async fn skip_stage_moves_on() {
        let c = counter();
        let s = setup(vec![
            Box::new(Blocking),
            Box::new(FakeOk { name: "after", executed: c.clone() }),
        ]);
        let handle = s.runner.handle();
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);

        let skipper = tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                if handle.stage.lock().is_some() {
                    handle.skip_stage();
                    break;
                }
            }
        });
        let summary = s.runner.run(&mut queue).await.unwrap();
        skipper.await.unwrap();

        assert_eq!(c.load(Ordering::SeqCst), 1);
        assert!(!summary.cancelled);
        assert_eq!(summary.files[0].failed_stages, ["blocking"]);
    }

    #[tokio::test]
    async fn cancel_stops_the_run_but_runs_finalizers() {
        let after = counter();
        let finalized = counter();
        let s = setup(vec![
            Box::new(Blocking),
            Box::new(FakeOk { name: "after", executed: after.clone() }),
            Box::new(Finalizer(finalized.clone())),
        ]);
        let handle = s.runner.handle();
        let mut queue = FileQueue::create(["/in/one.mp4", "/in/two.mp4"], false);

        let canceller = tokio::spawn({
            let handle = handle.clone();
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                handle.cancel();
            }
        });
        let summary = s.runner.run(&mut queue).await.unwrap();
        canceller.await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.failed, 1);
        let states: Vec<FileState> = queue.iter().map(|f| f.state).collect();
        assert_eq!(states, [FileState::Failed, FileState::Queued]);
    }

    #[tokio::test]
    async fn cancel_after_a_finished_stage_still_fails_the_file() {
        let first = counter();
        let finalized = counter();
        let s = setup(vec![
            Box::new(FakeOk { name: "first", executed: first.clone() }),
            Box::new(Blocking),
            Box::new(Finalizer(finalized.clone())),
        ]);
        let handle = s.runner.handle();
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            handle.cancel();
        });
        let summary = s.runner.run(&mut queue).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.files[0].state, FileState::Failed);
        assert_eq!(summary.files[0].failed_stages, ["blocking"]);
    }

    #[tokio::test]
    async fn finalizer_success_does_not_rescue_a_failed_file() {
        let finalized = counter();
        let s = setup(vec![Box::new(FakeFail), Box::new(Finalizer(finalized.clone()))]);
        let mut queue = FileQueue::create(["/in/movie.mp4"], false);
        let summary = s.runner.run(&mut queue).await.unwrap();

        assert_eq!(finalized.load(Ordering::SeqCst), 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.files[0].state, FileState::Failed);
    }
}
