//! Scoped temporary working area of a running job.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::StageFile;

/// A job's temp directory (`<output>/temp`), created fresh when the job
/// starts and removed when it is dropped, whatever the outcome.
///
/// An existing directory at that path is never adopted, so removal only
/// ever touches what the job itself created. Removal is best effort;
/// failures are logged and never replace the job's own result.
#[derive(Debug)]
pub struct TempWorkspace {
    path: PathBuf,
}

impl TempWorkspace {
    /// Create `temp` (and its missing parents). Fails with
    /// `AlreadyExists` when `temp` is already there.
    pub fn create(temp: &Path) -> io::Result<Self> {
        if let Some(parent) = temp.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(temp).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "{} already exists; move or delete it before starting a job",
                        temp.display()
                    ),
                )
            } else {
                e
            }
        })?;
        let path = match fs::canonicalize(temp) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_dir(temp);
                return Err(e);
            }
        };
        tracing::debug!("Created temp directory {}", path.display());
        Ok(Self { path })
    }

    /// Absolute path of the temp directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete one iteration's staged files.
    pub fn remove_files(&self, files: &[StageFile]) {
        for file in files {
            if !file.path.exists() {
                continue;
            }
            if let Err(e) = fs::remove_file(&file.path) {
                tracing::warn!("Failed to remove {}: {}", file.path.display(), e);
            }
        }
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!("Removed temp directory {}", self.path.display()),
            Err(e) => tracing::warn!(
                "Failed to remove temp directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
