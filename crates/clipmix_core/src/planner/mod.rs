//! Job planning.
//!
//! Turns a [`JobSpec`](crate::models::JobSpec) into concrete work:
//! - Resolve segmentation (manual, or auto from a target length)
//! - Validate the job before anything runs
//! - Per output: sample clips, pick music, build the ordered stage list
//!
//! The planner makes every audio-mode, sound-effect and background-music
//! decision. The runner executes the resulting stages without branching.

mod errors;
#[allow(clippy::module_inception)]
mod planner;
mod sampling;
mod segments;

pub use errors::{PlanError, PlanResult};
pub use planner::JobPlanner;
pub use sampling::sample_clips;
pub use segments::{
    format_total, parse_auto, parse_generate_count, parse_manual, Segmentation,
    DEFAULT_SEGMENT_SECONDS,
};
