//! Settings file on disk.
//!
//! The whole document is written once, when the file is first created.
//! Afterwards the control surface rewrites one table at a time through
//! `toml_edit`, so hand edits in other tables are left alone. Every write
//! lands in a sibling `.toml.tmp` first and is renamed over the real file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("settings file is not valid: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("settings file cannot be edited: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("no settings file at {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings document and the in-memory [`Settings`] loaded from it.
///
/// The pipeline only reads a snapshot of these settings when a job starts;
/// write-back is the control surface's job.
pub struct ConfigManager {
    file: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Nothing is read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only; persist with [`update_section`](Self::update_section).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn load(&mut self) -> ConfigResult<()> {
        let text = match fs::read_to_string(&self.file) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.file.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        self.settings = toml::from_str(&text)?;
        Ok(())
    }

    /// Load the file, or write a fresh one from defaults when there is none.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        match self.load() {
            Err(ConfigError::NotFound(_)) => {
                self.settings = Settings::default();
                self.save()
            }
            other => other,
        }
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Replace the whole file with the current settings.
    pub fn save(&self) -> ConfigResult<()> {
        let mut text = String::from("# clipmix settings\n\n");
        for section in ConfigSection::all() {
            text.push_str(heading(section));
            text.push('\n');
            text.push_str(&format!("[{}]\n", section.table_name()));
            let body = self.render(section)?;
            text.push_str(body.trim_end());
            text.push_str("\n\n");
        }
        self.write_replacing(&text)?;
        Ok(())
    }

    /// Rewrite one table in the file on disk.
    ///
    /// The file is re-read first, so tables changed by someone else since
    /// the last load are kept as they are.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = match fs::read_to_string(&self.file) {
            Ok(text) if !text.trim().is_empty() => text.parse::<DocumentMut>()?,
            Ok(_) => DocumentMut::new(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => return Err(e.into()),
        };

        let table = self.render(section)?.parse::<DocumentMut>()?;
        doc[section.table_name()] = Item::Table(table.as_table().clone());
        self.write_replacing(&doc.to_string())?;
        Ok(())
    }

    fn render(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        Ok(match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Tools => toml::to_string_pretty(&s.tools)?,
            ConfigSection::Encoding => toml::to_string_pretty(&s.encoding)?,
            ConfigSection::Mix => toml::to_string_pretty(&s.mix)?,
            ConfigSection::MusicPools => toml::to_string_pretty(&s.music_pools)?,
        })
    }

    fn write_replacing(&self, text: &str) -> io::Result<()> {
        if let Some(dir) = self.file.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let staging = self.file.with_extension("toml.tmp");
        let mut out = fs::File::create(&staging)?;
        out.write_all(text.as_bytes())?;
        out.sync_all()?;
        drop(out);
        fs::rename(&staging, &self.file)
    }
}

fn heading(section: ConfigSection) -> &'static str {
    match section {
        ConfigSection::Paths => "# Input, output and log folders",
        ConfigSection::Logging => "# Job log files",
        ConfigSection::Tools => "# External media tools",
        ConfigSection::Encoding => "# Encoder constants",
        ConfigSection::Mix => "# Last used mix options",
        ConfigSection::MusicPools => "# Background music pools (name = folder)",
    }
}
