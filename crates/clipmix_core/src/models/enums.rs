//! Core enums describing how a mix job treats audio.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the original clip audio is treated.
///
/// The three modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// Keep the clip audio as-is.
    #[default]
    Normal,
    /// Keep only the vocal band of the clip audio.
    VoiceOnly,
    /// Strip all clip audio.
    Silent,
}

impl std::fmt::Display for AudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioMode::Normal => write!(f, "normal"),
            AudioMode::VoiceOnly => write!(f, "voice-only"),
            AudioMode::Silent => write!(f, "silent"),
        }
    }
}

impl FromStr for AudioMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(AudioMode::Normal),
            "voice-only" | "voice_only" | "voice" => Ok(AudioMode::VoiceOnly),
            "silent" | "mute" => Ok(AudioMode::Silent),
            other => Err(format!("unknown audio mode '{}'", other)),
        }
    }
}

/// When a sound effect is mixed into the output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum SoundEffectPolicy {
    /// No sound effect.
    #[default]
    None,
    /// Mix the effect at the start of every clip.
    PerClip(PathBuf),
    /// Mix the effect once at the start of the merged video.
    WholeVideoStart(PathBuf),
}

impl SoundEffectPolicy {
    /// Path to the effect file, if any.
    pub fn effect_path(&self) -> Option<&PathBuf> {
        match self {
            SoundEffectPolicy::None => None,
            SoundEffectPolicy::PerClip(path) | SoundEffectPolicy::WholeVideoStart(path) => {
                Some(path)
            }
        }
    }

    /// Short name used in logs and CLI flags.
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffectPolicy::None => "none",
            SoundEffectPolicy::PerClip(_) => "per-clip",
            SoundEffectPolicy::WholeVideoStart(_) => "whole-video-start",
        }
    }
}

/// Background-music timing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicTiming {
    /// Loop and trim the music to the video's length.
    #[default]
    FollowVideo,
    /// Retime the video so it lasts exactly as long as the music.
    FollowMusic,
}

impl std::fmt::Display for MusicTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MusicTiming::FollowVideo => write!(f, "follow-video"),
            MusicTiming::FollowMusic => write!(f, "follow-music"),
        }
    }
}

impl FromStr for MusicTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow-video" | "follow_video" | "video" => Ok(MusicTiming::FollowVideo),
            "follow-music" | "follow_music" | "music" => Ok(MusicTiming::FollowMusic),
            other => Err(format!("unknown music timing '{}'", other)),
        }
    }
}

/// Background-music policy with the tracks eligible for selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackgroundMusicPolicy {
    /// No background music.
    #[default]
    Off,
    /// Replace clip audio with one randomly chosen track.
    On {
        timing: MusicTiming,
        tracks: Vec<PathBuf>,
    },
}

impl BackgroundMusicPolicy {
    /// Whether background music is active.
    pub fn is_on(&self) -> bool {
        matches!(self, BackgroundMusicPolicy::On { .. })
    }
}

/// How segment duration and count are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SegmentMode {
    /// Explicit per-clip duration and clip count.
    Manual { duration: f64, count: usize },
    /// Target total duration; count and duration are derived.
    Auto { target_seconds: f64 },
}

impl Default for SegmentMode {
    fn default() -> Self {
        SegmentMode::Manual {
            duration: 5.0,
            count: 10,
        }
    }
}
