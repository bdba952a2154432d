//! vf-core: shared error taxonomy, configuration, the resolution table and
//! identifier helpers.
//!
//! This crate is the foundational dependency for all other vf-* crates.

pub mod config;
pub mod error;
pub mod ids;
pub mod resolution;

// Re-export the most commonly used items at the crate root.
pub use config::Config;
pub use error::{Error, Result};
pub use resolution::{Resolution, ResolutionSpec};
