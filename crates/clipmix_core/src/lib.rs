//! clipmix core - backend logic for building mixed short-form videos.
//!
//! This crate contains the mix job pipeline with zero UI dependencies:
//! planning a job (clip sampling, segmentation, stage list), executing the
//! stages through an external media engine, and naming the results.
//! It can be driven by a GUI or by the `clipmix` command-line tool.

pub mod config;
pub mod logging;
pub mod media;
pub mod models;
pub mod music;
pub mod naming;
pub mod planner;
pub mod runner;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
