//! Typed view of the settings file. Every table is optional on disk and
//! missing keys take their defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Everything the settings file holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Input, output and log folders.
    #[serde(default)]
    pub paths: PathSettings,

    /// `[logging]`: job log file behavior.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Encoder constants used by every stage.
    #[serde(default)]
    pub encoding: EncodingSettings,

    /// Last-used mix options.
    #[serde(default)]
    pub mix: MixSettings,

    /// Registered music pools (name -> folder).
    #[serde(default)]
    pub music_pools: BTreeMap<String, String>,
}

/// `[paths]`: remembered folders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Last used input folder.
    #[serde(default)]
    pub input_folder: String,

    /// Last used output folder.
    #[serde(default)]
    pub output_folder: String,

    /// Folder for per-job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            input_folder: String::new(),
            output_folder: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// `[logging]`: job log file behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Keep tool output out of the log unless a stage fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines kept for failure diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Encoder executable (name on PATH or full path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Probe executable (name on PATH or full path).
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    /// Per-invocation timeout in seconds (0 disables the timeout).
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            timeout_secs: 0,
        }
    }
}

/// Encoder constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Target frame width.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Target frame height.
    #[serde(default = "default_height")]
    pub height: u32,

    /// x264 constant rate factor.
    #[serde(default = "default_crf")]
    pub crf: u32,

    /// x264 preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// AAC bitrate.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Background music level as a fraction of full volume.
    #[serde(default = "default_music_volume")]
    pub music_volume: f64,

    /// Resample rate applied to looped background music.
    #[serde(default = "default_music_sample_rate")]
    pub music_sample_rate: u32,

    /// Lower edge of the vocal band in Hz.
    #[serde(default = "default_voice_low")]
    pub voice_low_hz: u32,

    /// Upper edge of the vocal band in Hz.
    #[serde(default = "default_voice_high")]
    pub voice_high_hz: u32,
}

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    1920
}

fn default_crf() -> u32 {
    18
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_music_volume() -> f64 {
    0.3
}

fn default_music_sample_rate() -> u32 {
    44100
}

fn default_voice_low() -> u32 {
    200
}

fn default_voice_high() -> u32 {
    3000
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            crf: default_crf(),
            preset: default_preset(),
            audio_bitrate: default_audio_bitrate(),
            music_volume: default_music_volume(),
            music_sample_rate: default_music_sample_rate(),
            voice_low_hz: default_voice_low(),
            voice_high_hz: default_voice_high(),
        }
    }
}

/// Mix options remembered between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixSettings {
    /// Segment length used by auto segmentation.
    #[serde(default = "default_segment_seconds")]
    pub default_segment_seconds: f64,

    /// Last used sound-effect file.
    #[serde(default)]
    pub sound_effect_path: String,

    /// Whether background music was enabled.
    #[serde(default)]
    pub background_music_enabled: bool,

    /// Last selected music pool.
    #[serde(default)]
    pub last_pool: String,

    /// Keep generating remaining outputs after one fails. When off, the
    /// first failed output ends the job.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
}

fn default_segment_seconds() -> f64 {
    5.0
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            default_segment_seconds: default_segment_seconds(),
            sound_effect_path: String::new(),
            background_music_enabled: false,
            last_pool: String::new(),
            continue_on_error: true,
        }
    }
}

/// One top-level table of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Tools,
    Encoding,
    Mix,
    MusicPools,
}

impl ConfigSection {
    /// Key of the table in the document.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Tools => "tools",
            ConfigSection::Encoding => "encoding",
            ConfigSection::Mix => "mix",
            ConfigSection::MusicPools => "music_pools",
        }
    }

    /// All sections in file order.
    pub fn all() -> [ConfigSection; 6] {
        [
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Tools,
            ConfigSection::Encoding,
            ConfigSection::Mix,
            ConfigSection::MusicPools,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[encoding]"));
        assert!(toml.contains("crf = 18"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[paths]\noutput_folder = \"renders\"\n\n[music_pools]\nlofi = \"/music/lofi\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.paths.output_folder, "renders");
        assert_eq!(parsed.paths.logs_folder, ".logs");
        assert_eq!(parsed.encoding.width, 1080);
        assert_eq!(parsed.mix.default_segment_seconds, 5.0);
        assert!(parsed.mix.continue_on_error);
        assert_eq!(parsed.music_pools.get("lofi").map(String::as_str), Some("/music/lofi"));
    }
}
