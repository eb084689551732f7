//! Executable scanning functionality

use crate::{CatalogStore, LibraryError};
use gameshelf_config::LauncherConfig;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of a directory scan
#[derive(Debug, Default)]
pub struct ScanReport {
    pub games_found: usize,
    pub games_added: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl ScanReport {
    /// Nothing matched; a normal outcome, not an error
    pub fn nothing_found(&self) -> bool {
        self.games_found == 0
    }
}

/// Executables found under a root, before they reach the catalog
#[derive(Debug, Default)]
pub struct Discovery {
    /// `(title, path)` pairs in traversal order
    pub games: Vec<(String, PathBuf)>,
    /// Nested directories that could not be read
    pub errors: Vec<String>,
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to scan, lowercase without the dot
    pub extensions: HashSet<String>,

    /// Directory names to skip
    pub skip_dirs: HashSet<String>,

    /// Scan subdirectories
    pub recursive: bool,

    /// Skip hidden files/directories
    pub skip_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: HashSet::from(["exe".to_string()]),
            skip_dirs: HashSet::new(),
            recursive: true,
            skip_hidden: false,
        }
    }
}

impl ScanConfig {
    pub fn from_config(config: &LauncherConfig) -> Self {
        Self {
            extensions: config
                .executable_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            ..Default::default()
        }
    }

    /// True when `path` has one of the configured extensions
    pub fn is_executable(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

/// Walks a directory tree for game executables
pub struct LibraryScanner {
    config: ScanConfig,
}

impl Default for LibraryScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryScanner {
    /// Create a new scanner with default config
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `root` and add every executable to the catalog
    ///
    /// Titles are the filename without its extension. Existing entries are
    /// not consulted, so scanning the same tree twice adds everything twice.
    pub fn scan(&self, root: &Path, store: &mut CatalogStore) -> Result<ScanReport, LibraryError> {
        let start = Instant::now();
        info!("Scanning {} for games", root.display());

        let discovery = self.discover(root)?;
        let mut report = ScanReport {
            games_found: discovery.games.len(),
            errors: discovery.errors,
            ..Default::default()
        };

        for (title, path) in discovery.games {
            let Some(target) = path.to_str() else {
                warn!("Skipping non-UTF-8 path {}", path.display());
                report
                    .errors
                    .push(format!("{}: path is not valid UTF-8", path.display()));
                continue;
            };
            store.add(&title, target, None)?;
            info!("Found and added game: {}", title);
            report.games_added += 1;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        if report.nothing_found() {
            info!("No games found in {}", root.display());
        } else {
            info!(
                "Scan of {} added {} games in {} ms",
                root.display(),
                report.games_added,
                report.duration_ms
            );
        }

        Ok(report)
    }

    /// Find executables under `root` without touching the catalog
    ///
    /// One recursive traversal; files and directories reached twice (via
    /// symlinks) are visited once, keyed by canonical path.
    pub fn discover(&self, root: &Path) -> Result<Discovery, LibraryError> {
        if !root.is_dir() {
            return Err(LibraryError::ScanError(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let entries = fs::read_dir(root).map_err(|e| {
            LibraryError::ScanError(format!("cannot read {}: {}", root.display(), e))
        })?;

        let mut discovery = Discovery::default();
        let mut seen = HashSet::new();
        seen.insert(canonical(root));
        self.scan_entries(entries, &mut seen, &mut discovery);

        Ok(discovery)
    }

    fn scan_dir(&self, path: &Path, seen: &mut HashSet<PathBuf>, discovery: &mut Discovery) {
        if !seen.insert(canonical(path)) {
            debug!("Skipping already visited {}", path.display());
            return;
        }

        match fs::read_dir(path) {
            Ok(entries) => self.scan_entries(entries, seen, discovery),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                discovery
                    .errors
                    .push(format!("{}: {}", path.display(), e));
            }
        }
    }

    fn scan_entries(
        &self,
        entries: fs::ReadDir,
        seen: &mut HashSet<PathBuf>,
        discovery: &mut Discovery,
    ) {
        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => paths.push(entry.path()),
                Err(e) => {
                    warn!("Unreadable directory entry: {}", e);
                    discovery.errors.push(format!("unreadable entry: {}", e));
                }
            }
        }
        paths.sort();

        for entry_path in paths {
            let name = entry_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            // Skip hidden files/directories
            if self.config.skip_hidden && name.starts_with('.') {
                continue;
            }

            if entry_path.is_dir() {
                if self.config.skip_dirs.contains(&name.to_lowercase()) {
                    continue;
                }

                if self.config.recursive {
                    self.scan_dir(&entry_path, seen, discovery);
                }
            } else if entry_path.is_file() && self.config.is_executable(&entry_path) {
                if !seen.insert(canonical(&entry_path)) {
                    continue;
                }
                if let Some(title) = title_for(&entry_path) {
                    discovery.games.push((title, entry_path));
                }
            }
        }
    }
}

/// Title derived from a file: its name without the extension
pub(crate) fn title_for(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy().trim().to_string();
    if stem.is_empty() { None } else { Some(stem) }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"MZ").unwrap();
    }

    #[test]
    fn test_scan_config_default() {
        let config = ScanConfig::default();
        assert!(config.extensions.contains("exe"));
        assert!(config.recursive);
        assert!(config.is_executable(Path::new("Game.EXE")));
        assert!(!config.is_executable(Path::new("readme.txt")));
        assert!(!config.is_executable(Path::new("exe")));
    }

    #[test]
    fn test_title_for() {
        assert_eq!(title_for(Path::new("/g/Half-Life 2.exe")).as_deref(), Some("Half-Life 2"));
        assert_eq!(title_for(Path::new("/g/game.tar.exe")).as_deref(), Some("game.tar"));
    }

    #[test]
    fn test_discover_nested_once() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("top.exe"));
        touch(&dir.path().join("sub").join("mid.exe"));
        touch(&dir.path().join("sub").join("deeper").join("low.exe"));
        touch(&dir.path().join("sub").join("notes.txt"));

        let scanner = LibraryScanner::new();
        let discovery = scanner.discover(dir.path()).unwrap();

        let mut titles: Vec<_> = discovery.games.iter().map(|(t, _)| t.clone()).collect();
        titles.sort();
        assert_eq!(titles, vec!["low", "mid", "top"]);
        assert!(discovery.errors.is_empty());
    }

    #[test]
    fn test_non_recursive() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("top.exe"));
        touch(&dir.path().join("sub").join("mid.exe"));

        let scanner = LibraryScanner::with_config(ScanConfig {
            recursive: false,
            ..Default::default()
        });
        let discovery = scanner.discover(dir.path()).unwrap();
        assert_eq!(discovery.games.len(), 1);
    }

    #[test]
    fn test_skip_dirs_and_hidden() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("Redist").join("vc.exe"));
        touch(&dir.path().join(".cache").join("tool.exe"));
        touch(&dir.path().join("game.exe"));

        let scanner = LibraryScanner::with_config(ScanConfig {
            skip_dirs: HashSet::from(["redist".to_string()]),
            skip_hidden: true,
            ..Default::default()
        });
        let discovery = scanner.discover(dir.path()).unwrap();
        assert_eq!(discovery.games.len(), 1);
        assert_eq!(discovery.games[0].0, "game");
    }

    #[test]
    fn test_missing_root_is_scan_error() {
        let dir = TempDir::new().unwrap();
        let err = LibraryScanner::new()
            .discover(&dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, LibraryError::ScanError(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_not_double_counted() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("real").join("game.exe"));
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let discovery = LibraryScanner::new().discover(dir.path()).unwrap();
        assert_eq!(discovery.games.len(), 1);
    }

    #[test]
    fn test_scan_adds_without_dedup() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.exe"));
        touch(&dir.path().join("nested").join("b.exe"));
        let mut store = CatalogStore::in_memory().unwrap();
        let scanner = LibraryScanner::new();

        let first = scanner.scan(dir.path(), &mut store).unwrap();
        assert_eq!(first.games_added, 2);

        let second = scanner.scan(dir.path(), &mut store).unwrap();
        assert_eq!(second.games_added, 2);
        assert_eq!(store.count().unwrap(), 4);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_path_skipped_and_reported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("good.exe"));
        touch(&dir.path().join(OsStr::from_bytes(b"bad\xff.exe")));
        let mut store = CatalogStore::in_memory().unwrap();

        let report = LibraryScanner::new().scan(dir.path(), &mut store).unwrap();
        assert_eq!(report.games_found, 2);
        assert_eq!(report.games_added, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("UTF-8"));

        let targets: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|g| g.launch_target)
            .collect();
        assert_eq!(targets.len(), 1);
        assert!(targets[0].ends_with("good.exe"));
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let mut store = CatalogStore::in_memory().unwrap();

        let report = LibraryScanner::new().scan(dir.path(), &mut store).unwrap();
        assert!(report.nothing_found());
        assert_eq!(report.games_added, 0);
    }
}
