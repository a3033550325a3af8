//! Runner state, status channel and job report.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::logging::LogCallback;
use crate::models::StageFile;

/// Progress callback.
///
/// Arguments: (iteration, phase, status text)
pub type ProgressCallback = Box<dyn Fn(usize, &RunPhase, &str) + Send + Sync>;

/// Where one output iteration currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Sampling,
    /// Per-clip transforms of clip `clip` (1-based) out of `count`.
    PerClipTransform { clip: usize, count: usize },
    Concatenating,
    PostMerge,
    Naming,
    Done,
    Failed,
}

impl RunPhase {
    /// Whether the iteration has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "Idle"),
            RunPhase::Sampling => write!(f, "Sampling clips"),
            RunPhase::PerClipTransform { clip, count } => {
                write!(f, "Processing clip {}/{}", clip, count)
            }
            RunPhase::Concatenating => write!(f, "Concatenating"),
            RunPhase::PostMerge => write!(f, "Finishing audio"),
            RunPhase::Naming => write!(f, "Saving"),
            RunPhase::Done => write!(f, "Done"),
            RunPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Mutable state of one output iteration.
///
/// Created when the iteration starts and dropped once it finalizes or
/// fails.
#[derive(Debug, Clone)]
pub struct RunState {
    pub iteration: usize,
    pub phase: RunPhase,
    pub clips: Vec<PathBuf>,
    pub staged: Vec<StageFile>,
    pub music: Option<PathBuf>,
    pub status: String,
}

impl RunState {
    pub fn new(iteration: usize) -> Self {
        Self {
            iteration,
            phase: RunPhase::Idle,
            clips: Vec::new(),
            staged: Vec::new(),
            music: None,
            status: String::new(),
        }
    }
}

/// Latest status text of the running job.
///
/// Single writer (the worker), any number of readers polling at their own
/// cadence. Only the latest value is kept.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<String>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, status: impl Into<String>) {
        *self.inner.write() = status.into();
    }

    pub fn current(&self) -> String {
        self.inner.read().clone()
    }
}

/// Caller-supplied hooks and sampling seed for one job.
#[derive(Default)]
pub struct RunOptions {
    /// Fixed sampling seed; entropy when `None`.
    pub seed: Option<u64>,
    /// Receives every job log line.
    pub log_callback: Option<LogCallback>,
    /// Receives every phase transition.
    pub progress: Option<ProgressCallback>,
}

impl RunOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}

/// Result of one requested output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputOutcome {
    /// Artifact written to `path`.
    Finalized { iteration: usize, path: PathBuf },
    /// Iteration aborted; no artifact was written.
    Failed {
        iteration: usize,
        stage: String,
        message: String,
    },
}

impl OutputOutcome {
    pub fn iteration(&self) -> usize {
        match self {
            OutputOutcome::Finalized { iteration, .. } | OutputOutcome::Failed { iteration, .. } => {
                *iteration
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutputOutcome::Finalized { .. })
    }
}

/// Summary of a finished job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_name: String,
    /// Number of outputs requested.
    pub requested: usize,
    /// One entry per iteration that ran, in order.
    pub outputs: Vec<OutputOutcome>,
}

impl JobReport {
    pub fn new(job_name: impl Into<String>, requested: usize) -> Self {
        Self {
            job_name: job_name.into(),
            requested,
            outputs: Vec::new(),
        }
    }

    /// Paths of every finalized artifact.
    pub fn artifacts(&self) -> Vec<&PathBuf> {
        self.outputs
            .iter()
            .filter_map(|o| match o {
                OutputOutcome::Finalized { path, .. } => Some(path),
                OutputOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.outputs.iter().filter(|o| !o.is_success()).count()
    }

    /// Every requested output was finalized.
    pub fn is_success(&self) -> bool {
        self.outputs.len() == self.requested && self.failures() == 0
    }
}
