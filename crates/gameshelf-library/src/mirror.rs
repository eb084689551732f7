//! Cover art mirroring
//!
//! Every cover image lives twice: once in the served directory and once in
//! the cache directory the static file server reads from. Both copies carry
//! the source's base filename.

use crate::LibraryError;
use gameshelf_config::LauncherConfig;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Writes cover art into the served and cache directories
#[derive(Debug, Clone)]
pub struct AssetMirror {
    served_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AssetMirror {
    pub fn new(served_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            served_dir: served_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn from_config(config: &LauncherConfig) -> Self {
        Self::new(&config.cover_art_dir, &config.cache_cover_art_dir)
    }

    pub fn served_dir(&self) -> &Path {
        &self.served_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Copy `source` into both directories, returning its base filename
    ///
    /// The image is staged as a temp file in each directory and both are
    /// persisted only once both copies are complete. An existing image with
    /// the same name is overwritten in both places.
    pub fn mirror(&self, source: &Path) -> Result<String, LibraryError> {
        if !source.is_file() {
            return Err(LibraryError::Asset(format!(
                "cover art not found: {}",
                source.display()
            )));
        }

        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LibraryError::Asset(format!("invalid cover art filename: {}", source.display()))
            })?
            .to_string();

        let mut staged = Vec::with_capacity(2);
        for dir in [&self.served_dir, &self.cache_dir] {
            let temp = stage_copy(source, dir).map_err(|e| {
                LibraryError::Asset(format!(
                    "failed to stage {} in {}: {}",
                    name,
                    dir.display(),
                    e
                ))
            })?;
            staged.push((temp, dir.join(&name)));
        }

        for (temp, dest) in staged {
            temp.persist(&dest).map_err(|e| {
                LibraryError::Asset(format!("failed to write {}: {}", dest.display(), e.error))
            })?;
            debug!("Mirrored cover art to {}", dest.display());
        }

        info!("Cover art '{}' mirrored", name);
        Ok(name)
    }

    /// Path of a stored image in the served directory
    pub fn served_path(&self, name: &str) -> Option<PathBuf> {
        safe_name(name).map(|n| self.served_dir.join(n))
    }

    /// Path of a stored image in the cache directory
    pub fn cached_path(&self, name: &str) -> Option<PathBuf> {
        safe_name(name).map(|n| self.cache_dir.join(n))
    }

    /// True when both copies of `name` exist
    pub fn is_mirrored(&self, name: &str) -> bool {
        match (self.served_path(name), self.cached_path(name)) {
            (Some(served), Some(cached)) => served.is_file() && cached.is_file(),
            _ => false,
        }
    }
}

fn stage_copy(source: &Path, dir: &Path) -> io::Result<NamedTempFile> {
    fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    let mut input = File::open(source)?;
    io::copy(&mut input, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

/// Reject names that would escape the asset directory
fn safe_name(name: &str) -> Option<&str> {
    let path = Path::new(name);
    let single = path.components().count() == 1 && path.file_name().is_some();
    if single && !name.contains(['/', '\\']) {
        Some(name)
    } else {
        None
    }
}

/// Music files available for the front-end, sorted by name
///
/// A missing directory has no music.
pub fn list_music(dir: &Path) -> Result<Vec<String>, LibraryError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    files.sort();
    Ok(files)
}
