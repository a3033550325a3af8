//! Error types for job planning.

use thiserror::Error;

use crate::media::ProbeError;

/// Planning failed; the job (or the output being planned) cannot start.
#[derive(Error, Debug)]
pub enum PlanError {
    /// A numeric or textual job field is missing or out of range.
    #[error("Invalid {field}: {message}")]
    InvalidParameter { field: String, message: String },

    /// Fewer selected clips than clips needed per output.
    #[error("Not enough clips selected: {available} available, {required} needed per output")]
    InsufficientClips { available: usize, required: usize },

    /// Background music is on but there is nothing to pick from.
    #[error("Background music is enabled but no eligible track is available")]
    NoMusicAvailable,

    /// Music duration lookup failed in follow-music mode.
    #[error("Could not read background music duration: {0}")]
    Probe(#[from] ProbeError),
}

impl PlanError {
    /// Create an invalid parameter error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error is reported before any work starts.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::InsufficientClips { .. }
        )
    }
}

/// Result type for planning.
pub type PlanResult<T> = Result<T, PlanError>;
