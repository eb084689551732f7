//! Front-end settings document
//!
//! Arbitrary JSON owned by the front-end. It is read and written as a whole;
//! nothing here merges keys.

use crate::ConfigError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A JSON settings file
#[derive(Debug, Clone)]
pub struct SettingsDocument {
    path: PathBuf,
}

impl SettingsDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document; an absent file reads as `{}`
    pub fn load(&self) -> Result<Value, ConfigError> {
        if !self.path.exists() {
            return Ok(Value::Object(Map::new()));
        }

        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Overwrite the document
    pub fn save(&self, settings: &Value) -> Result<(), ConfigError> {
        if !settings.is_object() {
            return Err(ConfigError::Invalid(
                "settings must be a JSON object".into(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        tracing::info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}
