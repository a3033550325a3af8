//! Job execution.
//!
//! The [`JobRunner`] drives each output through its planned stages:
//!
//! ```text
//! Idle → Sampling → PerClipTransform(1..n) → Concatenating → PostMerge → Naming → Done
//!                                   any stage ─────────────────────────────────→ Failed
//! ```
//!
//! Outputs run strictly one after another. Staged files live in the job's
//! temp directory, which is removed when the job ends.

mod errors;
#[allow(clippy::module_inception)]
mod runner;
mod types;
mod workspace;

pub use errors::{RunnerError, RunnerResult, StageError};
pub use runner::JobRunner;
pub use types::{
    JobReport, OutputOutcome, ProgressCallback, RunOptions, RunPhase, RunState, StatusBoard,
};
pub use workspace::TempWorkspace;
