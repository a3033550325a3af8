//! Job specification for one mix request.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::{AudioMode, BackgroundMusicPolicy, SegmentMode, SoundEffectPolicy};

/// Immutable input to one mix run.
///
/// Built once per "start" action by the control surface and never
/// modified afterwards. The planner validates it before any work starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Folder the selected clips live in.
    pub source_folder: PathBuf,
    /// Selected clip filenames (relative to `source_folder`).
    pub clips: Vec<String>,
    /// Segment duration/count selection.
    pub segments: SegmentMode,
    /// Number of output artifacts to generate.
    pub generate_count: usize,
    /// Folder final artifacts are written to.
    pub output_folder: PathBuf,
    /// Base name for generated artifacts.
    pub output_base_name: String,
    /// Treatment of the clip audio.
    #[serde(default)]
    pub audio_mode: AudioMode,
    /// Sound-effect policy.
    #[serde(default)]
    pub sound_effect: SoundEffectPolicy,
    /// Background-music policy.
    #[serde(default)]
    pub background_music: BackgroundMusicPolicy,
}

impl JobSpec {
    /// Create a job spec with default audio treatment and a single output.
    pub fn new(
        source_folder: impl Into<PathBuf>,
        clips: Vec<String>,
        output_folder: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_folder: source_folder.into(),
            clips,
            segments: SegmentMode::default(),
            generate_count: 1,
            output_folder: output_folder.into(),
            output_base_name: "mix".to_string(),
            audio_mode: AudioMode::default(),
            sound_effect: SoundEffectPolicy::default(),
            background_music: BackgroundMusicPolicy::default(),
        }
    }

    /// Set the segmentation mode.
    pub fn with_segments(mut self, segments: SegmentMode) -> Self {
        self.segments = segments;
        self
    }

    /// Set the number of outputs to generate.
    pub fn with_generate_count(mut self, count: usize) -> Self {
        self.generate_count = count;
        self
    }

    /// Set the output base name.
    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.output_base_name = name.into();
        self
    }

    /// Set the audio mode.
    pub fn with_audio_mode(mut self, mode: AudioMode) -> Self {
        self.audio_mode = mode;
        self
    }

    /// Set the sound-effect policy.
    pub fn with_sound_effect(mut self, policy: SoundEffectPolicy) -> Self {
        self.sound_effect = policy;
        self
    }

    /// Set the background-music policy.
    pub fn with_background_music(mut self, policy: BackgroundMusicPolicy) -> Self {
        self.background_music = policy;
        self
    }

    /// Full path of a selected clip.
    pub fn clip_path(&self, name: &str) -> PathBuf {
        self.source_folder.join(name)
    }

    /// Temporary working area for this job (`<output>/temp`).
    pub fn temp_dir(&self) -> PathBuf {
        self.output_folder.join("temp")
    }

    /// Whether clip audio survives the first transform stage.
    ///
    /// Background music replaces clip audio, so it strips audio just
    /// like silent mode.
    pub fn keeps_clip_audio(&self) -> bool {
        self.audio_mode != AudioMode::Silent && !self.background_music.is_on()
    }

    /// Whether the vocal band filter runs on each clip.
    pub fn isolates_voice(&self) -> bool {
        self.audio_mode == AudioMode::VoiceOnly && self.keeps_clip_audio()
    }
}
