//! vf-wire: the line-oriented event protocol spoken between a worker and
//! its supervisor.
//!
//! - [`events`]: the [`LogEvent`] tagged union and its two encodings
//! - [`parse`]: the total decoder for both encodings
//! - [`reporter`]: progress, step and message emission on stdout
//! - [`layer`]: a tracing layer that forwards log records as wire messages
//! - [`monitor`]: folds a decoded stream back into per-file state

pub mod events;
pub mod layer;
pub mod monitor;
pub mod parse;
pub mod reporter;

pub use events::{LogEvent, LogKind, ProgressEvent, ProgressStatus, StepEvent};
pub use layer::WireLayer;
pub use monitor::{FileView, QueueMonitor, StepView};
pub use parse::{parse, parse_stderr};
pub use reporter::{MemoryWriter, Progress, RenderMode, Reporter};
