//! Configuration management for Gameshelf
//!
//! Supplies the flat launcher configuration (database location, scan roots,
//! platform install roots, asset directories) and the free-form settings
//! document the front-end reads and writes wholesale.

mod handle;
mod settings;

pub use handle::ConfigHandle;
pub use settings::SettingsDocument;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "GAMESHELF_CONFIG";

/// Application directory name under the platform config/data/cache roots
pub const APP_DIR: &str = "gameshelf";

/// Launcher configuration
///
/// Every key has a default so a partial file still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// SQLite catalog database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory scanned for executables
    #[serde(default = "default_scan_directory")]
    pub scan_directory: PathBuf,

    /// Steam installation root
    #[serde(default)]
    pub steam_path: Option<PathBuf>,

    /// Epic Games installation root
    #[serde(default)]
    pub epic_path: Option<PathBuf>,

    /// Served cover art directory
    #[serde(default = "default_cover_art_dir")]
    pub cover_art_dir: PathBuf,

    /// Cached cover art directory (what the static file server reads)
    #[serde(default = "default_cache_cover_art_dir")]
    pub cache_cover_art_dir: PathBuf,

    /// Background music directory
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,

    /// Front-end settings document
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Scan the scan directory and Steam before opening the menu
    #[serde(default)]
    pub scan_on_startup: bool,

    /// URI schemes treated as launcher actions instead of file paths
    #[serde(default = "default_uri_schemes")]
    pub uri_schemes: Vec<String>,

    /// File extensions considered executable (without the dot)
    #[serde(default = "default_executable_extensions")]
    pub executable_extensions: Vec<String>,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(APP_DIR)
}

fn default_db_path() -> PathBuf {
    data_dir().join("launcher.db")
}

fn default_scan_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_cover_art_dir() -> PathBuf {
    data_dir().join("cover_art")
}

fn default_cache_cover_art_dir() -> PathBuf {
    cache_dir().join("cover_art")
}

fn default_music_dir() -> PathBuf {
    data_dir().join("music")
}

fn default_settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

fn default_uri_schemes() -> Vec<String> {
    vec!["steam".to_string(), "com.epicgames.launcher".to_string()]
}

fn default_executable_extensions() -> Vec<String> {
    vec!["exe".to_string()]
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            scan_directory: default_scan_directory(),
            steam_path: None,
            epic_path: None,
            cover_art_dir: default_cover_art_dir(),
            cache_cover_art_dir: default_cache_cover_art_dir(),
            music_dir: default_music_dir(),
            settings_path: default_settings_path(),
            scan_on_startup: false,
            uri_schemes: default_uri_schemes(),
            executable_extensions: default_executable_extensions(),
        }
    }
}

impl LauncherConfig {
    /// Load configuration from a file
    ///
    /// `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = if is_json(path) {
            serde_json::from_str(&contents)?
        } else {
            toml::from_str(&contents)?
        };

        config.normalized()
    }

    /// Load configuration from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            return Self::load(&path);
        }

        tracing::warn!(
            "No configuration file at {}, using defaults",
            path.display()
        );
        Ok(Self::default())
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Save configuration to a file, in the format its extension names
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Validate and canonicalize list-valued keys
    ///
    /// Extensions lose any leading dot and are lowercased; schemes are
    /// lowercased and must not carry the `://` separator.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".into()));
        }

        for scheme in &mut self.uri_schemes {
            let trimmed = scheme.trim().to_lowercase();
            if trimmed.is_empty() || trimmed.contains(':') || trimmed.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "invalid URI scheme '{}'",
                    scheme
                )));
            }
            *scheme = trimmed;
        }

        self.executable_extensions = self
            .executable_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Ok(self)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
