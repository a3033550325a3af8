use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a [`JobLogger`](super::JobLogger) filters and formats.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Tool stderr goes to the tail only, not to the log.
    pub compact: bool,
    /// Tool stderr lines kept for the failure dump; 0 keeps none.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

impl LogConfig {
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: LogLevel::Info,
            compact: settings.compact,
            error_tail: settings.error_tail as usize,
            show_timestamps: settings.show_timestamps,
        }
    }
}

/// Receives every formatted job log line.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Decoration for the kinds of line a job log contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Command,
    Output,
    Stage,
    Success,
    Warning,
    Error,
}

impl Marker {
    pub fn apply(self, text: &str) -> String {
        match self {
            Marker::Command => format!("$ {}", text),
            Marker::Output => format!("=== {} ===", text),
            Marker::Stage => format!("--- {} ---", text),
            Marker::Success => format!("[SUCCESS] {}", text),
            Marker::Warning => format!("[WARNING] {}", text),
            Marker::Error => format!("[ERROR] {}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers() {
        assert_eq!(Marker::Command.apply("ffmpeg -y"), "$ ffmpeg -y");
        assert_eq!(Marker::Output.apply("Output 1/3"), "=== Output 1/3 ===");
        assert_eq!(Marker::Warning.apply("slow"), "[WARNING] slow");
    }

    #[test]
    fn config_follows_settings() {
        let settings = LoggingSettings {
            compact: false,
            error_tail: 7,
            show_timestamps: false,
        };
        let config = LogConfig::from_settings(&settings);
        assert!(!config.compact);
        assert_eq!(config.error_tail, 7);
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error > LogLevel::Warn);
    }
}
