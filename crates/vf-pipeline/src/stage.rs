//! The [`Stage`] trait defines one step of the per-file pipeline.
//!
//! The runner walks a fixed, ordered list of stages for every file. A stage
//! decides from the configuration whether it takes part, may name a missing
//! prerequisite artifact, and records what it produced in [`Artifacts`].

use async_trait::async_trait;
use vf_core::Config;

use crate::artifacts::Artifacts;
use crate::context::StageContext;

/// A single step in the per-file pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short process name used in step events (e.g. `"compress"`).
    fn name(&self) -> &'static str;

    /// Whether the configuration enables this stage. Disabled stages are
    /// skipped silently and keep their position in the step numbering.
    fn enabled(&self, config: &Config) -> bool;

    /// Reason the stage cannot run with the artifacts produced so far.
    fn requires(&self, _artifacts: &Artifacts) -> Option<&'static str> {
        None
    }

    /// Finalizers still run for the current file after cancellation.
    fn finalizer(&self) -> bool {
        false
    }

    /// Do the work, recording outputs in `artifacts`.
    ///
    /// An error means the stage yielded nothing; the runner logs it and moves
    /// on to the next stage.
    async fn run(&self, ctx: &StageContext<'_>, artifacts: &mut Artifacts) -> vf_core::Result<()>;
}
