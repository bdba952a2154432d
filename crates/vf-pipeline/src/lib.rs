//! # vf-pipeline
//!
//! Per-file orchestration of the vodforge media stages.
//!
//! This crate provides:
//!
//! - **[`FileQueue`]** -- ordered, de-duplicated [`QueuedFile`] descriptors
//!   with destination folder naming.
//! - **[`Stage`]** trait -- one media operation with an enable predicate,
//!   an optional prerequisite and a finalizer flag.
//! - **[`StageContext`]** -- what a stage sees: the file, its destination,
//!   config, tools, reporter, a cancellation token and a shared source probe.
//! - **Built-in stages** ([`stages`]) -- transcode, manifest, compress,
//!   preview, storyboard, audio, transcribe, translate, cleanup.
//! - **[`Runner`]** -- walks the queue, emits step events, contains stage
//!   failures and honours [`RunnerHandle`] cancellation.

pub mod artifacts;
pub mod context;
pub mod queue;
pub mod runner;
pub mod stage;
pub mod stages;

// Re-export key types at the crate root.
pub use artifacts::Artifacts;
pub use context::StageContext;
pub use queue::{FileQueue, FileState, QueuedFile, ALLOWED_EXTENSIONS};
pub use runner::{FileReport, RunSummary, Runner, RunnerHandle};
pub use stage::Stage;
pub use stages::default_stages;
