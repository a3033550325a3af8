//! Source clip library: the candidate clips in one folder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extensions recognised as source video clips (lowercase).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// A folder plus the ordered list of clip filenames found in it.
///
/// Rebuilt whenever the folder changes; the pipeline only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLibrary {
    folder: PathBuf,
    clips: Vec<String>,
}

impl SourceLibrary {
    /// Scan a folder for video clips, sorted by filename.
    pub fn scan(folder: impl Into<PathBuf>) -> io::Result<Self> {
        let folder = folder.into();
        let mut clips = Vec::new();

        for entry in fs::read_dir(&folder)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if has_extension(&name, VIDEO_EXTENSIONS) {
                clips.push(name);
            }
        }
        clips.sort();

        tracing::debug!("Found {} clips in {}", clips.len(), folder.display());

        Ok(Self { folder, clips })
    }

    /// The scanned folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Clip filenames in display order.
    pub fn clips(&self) -> &[String] {
        &self.clips
    }

    /// Whether the library contains a clip with this filename.
    pub fn contains(&self, name: &str) -> bool {
        self.clips.iter().any(|c| c == name)
    }

    /// Number of clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether no clips were found.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Full path of a clip.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }
}

/// Case-insensitive extension check against a lowercase list.
pub fn has_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        })
        .unwrap_or(false)
}
