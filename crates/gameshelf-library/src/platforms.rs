//! Third-party launcher integrations
//!
//! Candidates come from a platform's install root, are filtered against
//! titles already in the catalog and a blacklist of helper executables, and
//! the rest are added without cover art.

use crate::scanner::title_for;
use crate::{CatalogStore, LibraryError, ScanConfig};
use gameshelf_config::ConfigHandle;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Filename fragments of installers, updaters and other non-game executables
const BLACKLIST: &[&str] = &[
    "unins",
    "setup",
    "crash",
    "redist",
    "launcher",
    "helper",
    "prereq",
    "anticheat",
    "dxsetup",
    "vc_redist",
    "updater",
    "report",
];

/// True when `file_name` looks like a non-game executable
pub fn is_blacklisted(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    BLACKLIST.iter().any(|fragment| lower.contains(fragment))
}

/// Supported launcher platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Steam,
    Epic,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Steam => write!(f, "Steam"),
            Platform::Epic => write!(f, "Epic Games"),
        }
    }
}

/// A game a platform offers for import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub launch_target: String,
    /// Executable filename, checked against the blacklist
    pub file_name: Option<String>,
}

/// Candidates found under an install root
#[derive(Debug, Default)]
pub struct CandidateScan {
    pub candidates: Vec<Candidate>,
    /// Entries that could not be read or used
    pub errors: Vec<String>,
}

/// Produces candidates from a platform install root
pub trait PlatformSource {
    fn platform(&self) -> Platform;

    fn candidates(&self, root: &Path) -> Result<CandidateScan, LibraryError>;
}

/// Steam library reader
///
/// Not implemented yet: it yields no candidates.
#[derive(Debug, Default)]
pub struct SteamSource;

impl PlatformSource for SteamSource {
    fn platform(&self) -> Platform {
        Platform::Steam
    }

    fn candidates(&self, root: &Path) -> Result<CandidateScan, LibraryError> {
        debug!("Steam discovery has no sources at {}", root.display());
        Ok(CandidateScan::default())
    }
}

/// Epic Games install reader
///
/// Each immediate subfolder of the root is one install; executables directly
/// inside it become candidates.
#[derive(Debug, Default)]
pub struct EpicSource {
    scan: ScanConfig,
}

impl EpicSource {
    pub fn new(scan: ScanConfig) -> Self {
        Self { scan }
    }
}

impl PlatformSource for EpicSource {
    fn platform(&self) -> Platform {
        Platform::Epic
    }

    fn candidates(&self, root: &Path) -> Result<CandidateScan, LibraryError> {
        let entries = fs::read_dir(root).map_err(|e| {
            LibraryError::ScanError(format!("cannot read {}: {}", root.display(), e))
        })?;

        let mut scan = CandidateScan::default();
        let mut installs: Vec<PathBuf> = entry_paths(entries, &mut scan.errors)
            .into_iter()
            .filter(|p| p.is_dir())
            .collect();
        installs.sort();

        for install in installs {
            let entries = match fs::read_dir(&install) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping unreadable install {}: {}", install.display(), e);
                    scan.errors.push(format!("{}: {}", install.display(), e));
                    continue;
                }
            };

            let mut files: Vec<PathBuf> = entry_paths(entries, &mut scan.errors)
                .into_iter()
                .filter(|p| p.is_file() && self.scan.is_executable(p))
                .collect();
            files.sort();

            for file in files {
                let Some(title) = title_for(&file) else {
                    continue;
                };
                let Some(target) = file.to_str() else {
                    scan.errors
                        .push(format!("{}: path is not valid UTF-8", file.display()));
                    continue;
                };
                scan.candidates.push(Candidate {
                    title,
                    launch_target: target.to_string(),
                    file_name: file.file_name().map(|n| n.to_string_lossy().to_string()),
                });
            }
        }

        Ok(scan)
    }
}

/// Paths of a directory's entries; unreadable entries go to `errors`
fn entry_paths(entries: fs::ReadDir, errors: &mut Vec<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => errors.push(format!("unreadable entry: {}", e)),
        }
    }
    paths
}

/// Games added per platform by [`PlatformIntegrations::scan_all`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlatformScanReport {
    pub steam: usize,
    pub epic: usize,
}

impl PlatformScanReport {
    pub fn total(&self) -> usize {
        self.steam + self.epic
    }
}

/// Imports games from Steam and Epic installs
///
/// Install roots are read from the configuration on every call, so edits
/// apply to the next scan.
pub struct PlatformIntegrations {
    config: ConfigHandle,
}

impl PlatformIntegrations {
    pub fn new(config: ConfigHandle) -> Self {
        Self { config }
    }

    /// Import Steam games, returning how many were added
    pub fn scan_steam(&self, store: &mut CatalogStore) -> Result<usize, LibraryError> {
        let root = self.config.snapshot()?.steam_path;
        self.ingest(&SteamSource, root.as_deref(), store)
    }

    /// Import Epic games, returning how many were added
    pub fn scan_epic(&self, store: &mut CatalogStore) -> Result<usize, LibraryError> {
        let config = self.config.snapshot()?;
        let source = EpicSource::new(ScanConfig::from_config(&config));
        self.ingest(&source, config.epic_path.as_deref(), store)
    }

    pub fn scan_all(&self, store: &mut CatalogStore) -> Result<PlatformScanReport, LibraryError> {
        Ok(PlatformScanReport {
            steam: self.scan_steam(store)?,
            epic: self.scan_epic(store)?,
        })
    }

    /// Filter a source's candidates and add the survivors
    ///
    /// An unset or missing root yields zero, which is not an error.
    pub fn ingest(
        &self,
        source: &dyn PlatformSource,
        root: Option<&Path>,
        store: &mut CatalogStore,
    ) -> Result<usize, LibraryError> {
        let platform = source.platform();
        let Some(root) = root else {
            info!("{} path not configured", platform);
            return Ok(0);
        };
        if !root.exists() {
            info!("{} path {} does not exist", platform, root.display());
            return Ok(0);
        }

        let scan = source.candidates(root)?;
        for error in &scan.errors {
            warn!("{}: {}", platform, error);
        }

        let mut known = store.titles()?;
        let mut added = 0;

        for candidate in scan.candidates {
            if known.contains(&candidate.title) {
                debug!("{}: '{}' already in catalog", platform, candidate.title);
                continue;
            }
            if candidate.file_name.as_deref().is_some_and(is_blacklisted) {
                debug!("{}: skipping non-game '{}'", platform, candidate.launch_target);
                continue;
            }

            store.add(&candidate.title, &candidate.launch_target, None)?;
            info!("Found and added {} game: {}", platform, candidate.title);
            known.insert(candidate.title);
            added += 1;
        }

        if added == 0 {
            info!("No new {} games found", platform);
        }
        Ok(added)
    }
}
