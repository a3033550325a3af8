//! Named background-music pools with cached track durations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::media::MediaProbe;
use crate::models::has_extension;

/// Extensions recognised as background-music tracks.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "flac", "ogg"];

/// Errors from pool registry operations.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("A music pool named '{0}' already exists")]
    DuplicateName(String),

    #[error("Folder {} is already registered as pool '{pool}'", .folder.display())]
    DuplicateFolder { folder: PathBuf, pool: String },

    #[error("Pool name must not be empty")]
    EmptyName,

    #[error("Unknown music pool '{0}'")]
    UnknownPool(String),

    #[error("Failed to read pool folder {}: {source}", .folder.display())]
    Io {
        folder: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PoolError {
    /// Whether the caller can retry with a different name or folder.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateName(_) | Self::DuplicateFolder { .. })
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

/// One track as shown in a pool listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub filename: String,
    pub path: PathBuf,
    /// `None` when the probe failed.
    pub duration: Option<f64>,
}

/// A registered folder of candidate tracks.
#[derive(Debug, Clone)]
struct MusicPool {
    folder: PathBuf,
    /// Loaded on first access, dropped on reload.
    tracks: Option<Vec<String>>,
    durations: HashMap<String, Option<f64>>,
}

impl MusicPool {
    fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            tracks: None,
            durations: HashMap::new(),
        }
    }

    fn load_tracks(&mut self) -> PoolResult<&[String]> {
        if self.tracks.is_none() {
            let entries = fs::read_dir(&self.folder).map_err(|source| PoolError::Io {
                folder: self.folder.clone(),
                source,
            })?;

            let mut names: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .filter(|name| has_extension(name, AUDIO_EXTENSIONS))
                .collect();
            names.sort();
            tracing::debug!("Loaded {} tracks from {}", names.len(), self.folder.display());
            self.tracks = Some(names);
        }
        Ok(self.tracks.as_deref().unwrap_or_default())
    }

    fn clear_cache(&mut self) {
        self.tracks = None;
        self.durations.clear();
    }
}

/// Registry of music pools plus the user's track selection.
///
/// Owned by the control surface and passed to whatever needs it; nothing
/// here is global.
pub struct MusicPoolRegistry {
    pools: BTreeMap<String, MusicPool>,
    probe: Arc<dyn MediaProbe>,
    active: Option<String>,
    selected: BTreeMap<String, BTreeSet<String>>,
}

impl MusicPoolRegistry {
    pub fn new(probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            pools: BTreeMap::new(),
            probe,
            active: None,
            selected: BTreeMap::new(),
        }
    }

    /// Rebuild from the persisted `[music_pools]` table and last-used pool.
    pub fn from_settings(
        pools: &BTreeMap<String, String>,
        last_pool: &str,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        let mut registry = Self::new(probe);
        for (name, folder) in pools {
            if let Err(e) = registry.add_pool(name, folder) {
                tracing::warn!("Skipping music pool '{}': {}", name, e);
            }
        }
        if registry.pools.contains_key(last_pool) {
            registry.active = Some(last_pool.to_string());
        }
        registry
    }

    /// Pool table for write-back into settings.
    pub fn to_settings(&self) -> BTreeMap<String, String> {
        self.pools
            .iter()
            .map(|(name, pool)| (name.clone(), pool.folder.to_string_lossy().to_string()))
            .collect()
    }

    /// Register `folder` under `name`.
    ///
    /// Collisions are reported, never resolved by renaming.
    pub fn add_pool(&mut self, name: &str, folder: impl Into<PathBuf>) -> PoolResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PoolError::EmptyName);
        }
        if self.pools.contains_key(name) {
            return Err(PoolError::DuplicateName(name.to_string()));
        }

        let folder = folder.into();
        let key = folder_key(&folder);
        if let Some((existing, _)) = self
            .pools
            .iter()
            .find(|(_, pool)| folder_key(&pool.folder) == key)
        {
            return Err(PoolError::DuplicateFolder {
                folder,
                pool: existing.clone(),
            });
        }

        tracing::info!("Added music pool '{}' -> {}", name, folder.display());
        self.pools.insert(name.to_string(), MusicPool::new(folder));
        Ok(())
    }

    /// Remove a pool with its cache and any selection referencing it.
    pub fn remove_pool(&mut self, name: &str) -> PoolResult<()> {
        if self.pools.remove(name).is_none() {
            return Err(PoolError::UnknownPool(name.to_string()));
        }
        self.selected.remove(name);
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        tracing::info!("Removed music pool '{}'", name);
        Ok(())
    }

    /// Pool names in sorted order.
    pub fn pool_names(&self) -> Vec<String> {
        self.pools.keys().cloned().collect()
    }

    pub fn folder_of(&self, name: &str) -> Option<&Path> {
        self.pools.get(name).map(|p| p.folder.as_path())
    }

    /// Track filenames, loading them on first access.
    pub fn track_names(&mut self, name: &str) -> PoolResult<Vec<String>> {
        let pool = self.pool_mut(name)?;
        Ok(pool.load_tracks()?.to_vec())
    }

    /// Tracks with their durations.
    ///
    /// Durations are probed once per track and cached until
    /// [`reload_pool`](Self::reload_pool). A failed probe is listed as
    /// unknown rather than failing the listing.
    pub fn list_tracks(&mut self, name: &str) -> PoolResult<Vec<TrackInfo>> {
        let probe = Arc::clone(&self.probe);
        let pool = self.pool_mut(name)?;
        let names = pool.load_tracks()?.to_vec();

        let mut listing = Vec::with_capacity(names.len());
        for filename in names {
            let path = pool.folder.join(&filename);
            let duration = *pool
                .durations
                .entry(filename.clone())
                .or_insert_with(|| match probe.duration(&path) {
                    Ok(secs) => Some(secs),
                    Err(e) => {
                        tracing::warn!("Could not read duration of {}: {}", path.display(), e);
                        None
                    }
                });
            listing.push(TrackInfo {
                filename,
                path,
                duration,
            });
        }
        Ok(listing)
    }

    /// Forget cached track names and durations for a pool.
    pub fn reload_pool(&mut self, name: &str) -> PoolResult<()> {
        self.pool_mut(name)?.clear_cache();
        Ok(())
    }

    /// Pool the user is currently picking tracks from.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn set_active(&mut self, name: &str) -> PoolResult<()> {
        if !self.pools.contains_key(name) {
            return Err(PoolError::UnknownPool(name.to_string()));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Mark a track as selected (or deselected) in a pool.
    pub fn select_track(&mut self, pool: &str, filename: &str, selected: bool) -> PoolResult<()> {
        if !self.pools.contains_key(pool) {
            return Err(PoolError::UnknownPool(pool.to_string()));
        }
        let set = self.selected.entry(pool.to_string()).or_default();
        if selected {
            set.insert(filename.to_string());
        } else {
            set.remove(filename);
        }
        Ok(())
    }

    /// Selected filenames of a pool, sorted.
    pub fn selected_tracks(&self, pool: &str) -> Vec<String> {
        self.selected
            .get(pool)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Track paths a job may draw from.
    ///
    /// The user's selection in the active pool, or every track of that pool
    /// when nothing is selected. Empty when no pool is active.
    pub fn eligible_tracks(&mut self) -> PoolResult<Vec<PathBuf>> {
        let Some(active) = self.active.clone() else {
            return Ok(Vec::new());
        };
        let selection = self.selected.get(&active).cloned().unwrap_or_default();
        let pool = self.pool_mut(&active)?;
        let folder = pool.folder.clone();

        Ok(pool
            .load_tracks()?
            .iter()
            .filter(|name| selection.is_empty() || selection.contains(name.as_str()))
            .map(|name| folder.join(name))
            .collect())
    }

    fn pool_mut(&mut self, name: &str) -> PoolResult<&mut MusicPool> {
        self.pools
            .get_mut(name)
            .ok_or_else(|| PoolError::UnknownPool(name.to_string()))
    }
}

/// Uniform random choice among `eligible`.
pub fn pick_random_track<R: Rng + ?Sized>(eligible: &[PathBuf], rng: &mut R) -> Option<PathBuf> {
    eligible.choose(rng).cloned()
}

fn folder_key(folder: &Path) -> PathBuf {
    fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf())
}
