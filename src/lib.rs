//! vodforge: turns raw videos into distribution bundles (HLS renditions, a
//! compressed MP4, an animated preview, storyboards and subtitles).
//!
//! The heavy lifting lives in the `vf-*` crates; this crate holds the command
//! line surface, configuration loading, input discovery and the supervisor
//! that runs a worker out of process.

pub mod cli;
pub mod config;
pub mod sources;
pub mod supervisor;
