//! Error types for job execution.
//!
//! Errors chain through layers: Job → Output → Stage → Operation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::media::TransformError;
use crate::planner::PlanError;

/// A job could not start, or one of its outputs failed.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Another job is still running.
    #[error("A job is already running")]
    AlreadyRunning,

    /// The job spec failed validation.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Temp directory or job log could not be created.
    #[error("Job setup failed: {message}")]
    Setup { message: String },

    /// A stage of one output failed.
    #[error("Output {iteration} failed at {stage}: {source}")]
    StageFailed {
        iteration: usize,
        stage: String,
        #[source]
        source: StageError,
    },
}

impl RunnerError {
    /// Create a setup failed error.
    pub fn setup_failed(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Create a stage failed error.
    pub fn stage_failed(iteration: usize, stage: impl Into<String>, source: StageError) -> Self {
        Self::StageFailed {
            iteration,
            stage: stage.into(),
            source,
        }
    }
}

/// Failure inside one output iteration.
#[derive(Error, Debug)]
pub enum StageError {
    /// The encode tool failed.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Sampling or music selection failed for this output.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A stage reported success without writing its output.
    #[error("Expected output was not written: {}", .0.display())]
    MissingOutput(PathBuf),

    /// Moving the finished file into place failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Whether the failure ends the whole job regardless of
    /// `continue_on_error`.
    pub fn is_job_fatal(&self) -> bool {
        matches!(self, Self::Plan(PlanError::Probe(_)))
    }
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ProbeError;

    #[test]
    fn stage_failure_names_output_and_stage() {
        let err = RunnerError::stage_failed(
            2,
            "Concat",
            TransformError::command_failed("ffmpeg", 1, "boom").into(),
        );
        let msg = err.to_string();
        assert!(msg.contains("Output 2"));
        assert!(msg.contains("Concat"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn probe_failure_is_job_fatal() {
        let probe: StageError =
            PlanError::Probe(ProbeError::FileNotFound(PathBuf::from("/m/a.mp3"))).into();
        assert!(probe.is_job_fatal());
        assert!(!StageError::from(PlanError::NoMusicAvailable).is_job_fatal());
    }
}
