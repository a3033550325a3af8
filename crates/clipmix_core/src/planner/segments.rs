//! Segment duration/count resolution and form-field parsing.

use super::errors::{PlanError, PlanResult};
use crate::models::SegmentMode;

/// Seconds per segment assumed by auto mode when not configured.
pub const DEFAULT_SEGMENT_SECONDS: f64 = 5.0;

/// Resolved per-clip duration and clip count for every output of a job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segmentation {
    /// Seconds taken from each sampled clip.
    pub duration: f64,
    /// Clips sampled per output.
    pub count: usize,
}

impl Segmentation {
    /// Resolve a segment mode.
    ///
    /// Auto mode uses `count = ceil(target / default_seconds)` and
    /// `duration = target / count`, so the planned total equals the target.
    pub fn resolve(mode: &SegmentMode, default_seconds: f64) -> PlanResult<Self> {
        match *mode {
            SegmentMode::Manual { duration, count } => {
                check_positive("segment duration", duration)?;
                if count == 0 {
                    return Err(PlanError::invalid("segment count", "must be at least 1"));
                }
                Ok(Self { duration, count })
            }
            SegmentMode::Auto { target_seconds } => {
                check_positive("target duration", target_seconds)?;
                check_positive("default segment length", default_seconds)?;
                let count = ((target_seconds / default_seconds).ceil() as usize).max(1);
                Ok(Self {
                    duration: target_seconds / count as f64,
                    count,
                })
            }
        }
    }

    /// Planned length of one output.
    pub fn total_seconds(&self) -> f64 {
        self.duration * self.count as f64
    }

    /// Duration as shown to the user (one decimal).
    pub fn duration_label(&self) -> String {
        format!("{:.1}", self.duration)
    }
}

/// One-decimal total label, e.g. `47.0 s`.
pub fn format_total(seconds: f64) -> String {
    format!("{:.1} s", seconds)
}

/// Parse the manual-mode duration and count fields.
pub fn parse_manual(duration: &str, count: &str) -> PlanResult<SegmentMode> {
    let duration = parse_seconds("segment duration", duration)?;
    let count = parse_count("segment count", count)?;
    Ok(SegmentMode::Manual { duration, count })
}

/// Parse the auto-mode target duration field.
pub fn parse_auto(target: &str) -> PlanResult<SegmentMode> {
    Ok(SegmentMode::Auto {
        target_seconds: parse_seconds("target duration", target)?,
    })
}

/// Parse the number of outputs to generate.
pub fn parse_generate_count(text: &str) -> PlanResult<usize> {
    parse_count("generate count", text)
}

fn parse_seconds(field: &str, text: &str) -> PlanResult<f64> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| PlanError::invalid(field, format!("'{}' is not a number", text.trim())))?;
    check_positive(field, value)?;
    Ok(value)
}

fn parse_count(field: &str, text: &str) -> PlanResult<usize> {
    let value: usize = text.trim().parse().map_err(|_| {
        PlanError::invalid(field, format!("'{}' is not a whole number", text.trim()))
    })?;
    if value == 0 {
        return Err(PlanError::invalid(field, "must be at least 1"));
    }
    Ok(value)
}

fn check_positive(field: &str, value: f64) -> PlanResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlanError::invalid(field, format!("{} must be greater than zero", value)))
    }
}
