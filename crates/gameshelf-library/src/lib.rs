//! Game catalog service for Gameshelf
//!
//! Owns the persisted catalog of games, mirrors cover art into the served
//! and cached asset directories, and discovers new games on disk and in
//! third-party launcher installs.

mod database;
mod mirror;
mod platforms;
mod scanner;

pub use database::{CatalogStore, Game, GameSummary, GameUpdate, IdPolicy};
pub use mirror::{AssetMirror, list_music};
pub use platforms::{
    Candidate, CandidateScan, EpicSource, Platform, PlatformIntegrations, PlatformScanReport,
    PlatformSource, SteamSource, is_blacklisted,
};
pub use scanner::{Discovery, LibraryScanner, ScanConfig, ScanReport};

use gameshelf_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Scan error: {0}")]
    ScanError(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl LibraryError {
    /// True for lookups of an unknown entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::GameNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LibraryError::GameNotFound(7);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Game not found: 7");

        let err = LibraryError::Validation("title is required".into());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("title is required"));
    }
}
