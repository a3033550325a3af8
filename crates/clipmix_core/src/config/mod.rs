//! Persisted clipmix settings: one TOML file, one table per [`ConfigSection`].
//!
//! # Example
//!
//! ```no_run
//! use clipmix_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/clipmix.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.settings_mut().mix.background_music_enabled = true;
//! config.update_section(ConfigSection::Mix).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, EncodingSettings, LoggingSettings, MixSettings, PathSettings, Settings,
    ToolSettings,
};
