//! Data models for clipmix.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for audio mode, sound-effect and background-music policy
//! - The job specification submitted by the control surface
//! - The stage list the planner builds for each output
//! - The source clip library

mod enums;
mod jobs;
mod library;
mod stages;

// Re-export all public types
pub use enums::{AudioMode, BackgroundMusicPolicy, MusicTiming, SegmentMode, SoundEffectPolicy};
pub use jobs::JobSpec;
pub use library::{has_extension, SourceLibrary, VIDEO_EXTENSIONS};
pub use stages::{MusicFit, OutputPlan, Stage, StageFile};
