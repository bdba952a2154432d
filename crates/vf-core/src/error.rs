//! Unified error type for the vodforge pipeline.
//!
//! All library crates funnel their failures into [`Error`]. The variants
//! follow the pipeline's containment rules: argument and tool errors are
//! caught at the stage boundary, unsupported inputs are skipped at queue
//! construction, and only configuration errors abort a whole batch.

use std::path::Path;

/// Unified error type covering all failure modes in vodforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required parameter was missing or invalid (unknown resolution tier,
    /// missing output destination, ...).
    #[error("Argument error: {0}")]
    Argument(String),

    /// The input file type is not supported and will be skipped.
    #[error("Unsupported input: {path}")]
    UnsupportedInput {
        /// The rejected source path.
        path: String,
    },

    /// An external tool (ffmpeg, whisper, trans, ...) failed to spawn, exited
    /// with a non-zero status, or failed mid-run.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// A text format (subtitle, probe JSON, wire line) could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The operation was cancelled before it completed.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// A pipeline stage failed.
    #[error("Pipeline error [{stage}]: {message}")]
    Pipeline {
        /// The stage that failed.
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// Configuration could not be loaded or is unusable.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::Argument`].
    pub fn argument(message: impl Into<String>) -> Self {
        Error::Argument(message.into())
    }

    /// Convenience constructor for [`Error::UnsupportedInput`].
    pub fn unsupported(path: &Path) -> Self {
        Error::UnsupportedInput {
            path: path.display().to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from a cancelled operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
