//! Shared, editable configuration

use crate::{ConfigError, LauncherConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Cloneable handle to the live configuration
///
/// Readers take a fresh snapshot per operation, so an edit is visible to the
/// next scan without restarting anything.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<LauncherConfig>>,
    path: Option<PathBuf>,
}

impl ConfigHandle {
    /// Wrap an in-memory configuration that is never persisted
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: None,
        }
    }

    /// Wrap a configuration backed by a file
    pub fn with_path(config: LauncherConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: Some(path.into()),
        }
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = match LauncherConfig::load(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                tracing::warn!(
                    "No configuration file at {}, using defaults",
                    path.display()
                );
                LauncherConfig::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Self::with_path(config, path))
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> Result<LauncherConfig, ConfigError> {
        let guard = self.inner.read().map_err(|_| ConfigError::Poisoned)?;
        Ok(guard.clone())
    }

    /// Replace the configuration wholesale and persist it
    ///
    /// The new value is validated first; on failure the current
    /// configuration is left untouched.
    pub fn edit(&self, config: LauncherConfig) -> Result<(), ConfigError> {
        let config = config.normalized()?;

        if let Some(path) = &self.path {
            config.save(path)?;
        }

        let mut guard = self.inner.write().map_err(|_| ConfigError::Poisoned)?;
        *guard = config;
        tracing::info!("Configuration updated");
        Ok(())
    }

    /// Apply a change to a copy of the current configuration, then `edit`
    pub fn update<F>(&self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut LauncherConfig),
    {
        let mut config = self.snapshot()?;
        change(&mut config);
        self.edit(config)
    }
}
