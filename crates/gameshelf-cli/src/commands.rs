//! Subcommand handlers

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use gameshelf_config::{ConfigHandle, LauncherConfig, SettingsDocument};
use gameshelf_launch::{LaunchExecutor, LaunchOutcome};
use gameshelf_library::{
    AssetMirror, CatalogStore, GameUpdate, LibraryScanner, PlatformIntegrations, ScanConfig,
    ScanReport, list_music,
};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List catalog entries
    List {
        /// Print the summary records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a game
    Add {
        title: String,
        /// Executable path or launcher URI
        target: String,
        /// Cover art image to mirror
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// Change fields of an existing game
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// Delete a game
    Delete { id: i64 },

    /// Delete several games at once
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Scan a directory for executables (defaults to the configured one)
    Scan { dir: Option<PathBuf> },

    /// Import Steam games
    ScanSteam,

    /// Import Epic Games installs
    ScanEpic,

    /// Launch a game and wait for it to exit
    Run { id: i64 },

    /// List background music files
    Music,

    /// Show or replace the front-end settings document
    Settings {
        /// JSON file whose object replaces the stored settings
        #[arg(long)]
        set: Option<PathBuf>,
    },

    /// Print the effective configuration, or replace it from a file
    Config {
        /// JSON or TOML file (by extension) replacing the configuration
        #[arg(long)]
        set: Option<PathBuf>,
        /// Print as TOML instead of JSON
        #[arg(long = "toml")]
        as_toml: bool,
    },
}

/// Everything a command needs: live config, catalog, launcher
pub struct Shelf {
    pub config: ConfigHandle,
    pub store: CatalogStore,
    pub executor: LaunchExecutor,
}

impl Shelf {
    pub fn open(config: ConfigHandle) -> Result<Self> {
        let snapshot = config.snapshot()?;
        let store = CatalogStore::open(&snapshot.db_path)
            .with_context(|| format!("Failed to open catalog {}", snapshot.db_path.display()))?
            .with_mirror(AssetMirror::from_config(&snapshot));
        let executor = LaunchExecutor::from_config(&snapshot);

        Ok(Self {
            config,
            store,
            executor,
        })
    }

    /// Scanner built from the current configuration
    pub fn scanner(&self) -> Result<LibraryScanner> {
        let snapshot = self.config.snapshot()?;
        Ok(LibraryScanner::with_config(ScanConfig::from_config(&snapshot)))
    }

    pub fn platforms(&self) -> PlatformIntegrations {
        PlatformIntegrations::new(self.config.clone())
    }

    /// Scan `dir`, or the configured scan directory
    pub fn scan(&mut self, dir: Option<PathBuf>) -> Result<ScanReport> {
        let dir = match dir {
            Some(dir) => dir,
            None => self.config.snapshot()?.scan_directory,
        };
        let scanner = self.scanner()?;
        let report = scanner
            .scan(&dir, &mut self.store)
            .with_context(|| format!("Failed to scan {}", dir.display()))?;
        Ok(report)
    }

    /// Start-up import of the scan directory and Steam
    pub fn startup_scan(&mut self) -> Result<()> {
        let dir = self.config.snapshot()?.scan_directory;
        if dir.is_dir() {
            self.scan(Some(dir))?;
        } else {
            warn!("Scan directory {} does not exist", dir.display());
        }
        self.platforms().scan_steam(&mut self.store)?;
        Ok(())
    }
}

/// Run one subcommand, writing its output to `out`
pub async fn execute(shelf: &mut Shelf, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::List { json } => {
            if json {
                let summaries = shelf.store.summaries()?;
                writeln!(out, "{}", serde_json::to_string_pretty(&summaries)?)?;
            } else {
                for game in shelf.store.list()? {
                    writeln!(out, "{:>4}  {:<32}  {}", game.id, game.title, game.launch_target)?;
                }
            }
        }
        Command::Add {
            title,
            target,
            cover,
        } => {
            let id = shelf.store.add(&title, &target, cover.as_deref())?;
            writeln!(out, "Added '{}' as {}", title, id)?;
        }
        Command::Update {
            id,
            title,
            target,
            cover,
        } => {
            let mut update = GameUpdate::new();
            if let Some(title) = title {
                update = update.with_title(title);
            }
            if let Some(target) = target {
                update = update.with_launch_target(target);
            }
            if let Some(cover) = cover {
                update = update.with_cover_art(cover);
            }
            if update.is_empty() {
                bail!("Nothing to update: pass --title, --target or --cover");
            }
            shelf.store.update(id, &update)?;
            writeln!(out, "Updated {}", id)?;
        }
        Command::Delete { id } => {
            if shelf.store.delete(id)? {
                writeln!(out, "Deleted {}", id)?;
            } else {
                writeln!(out, "No game with id {}", id)?;
            }
        }
        Command::BulkDelete { ids } => {
            let removed = shelf.store.bulk_delete(&ids)?;
            writeln!(out, "Deleted {} games", removed)?;
        }
        Command::Scan { dir } => {
            let report = shelf.scan(dir)?;
            for error in &report.errors {
                warn!("{}", error);
            }
            if report.nothing_found() {
                writeln!(out, "No games found")?;
            } else {
                writeln!(
                    out,
                    "Found {} games, added {} ({} ms)",
                    report.games_found, report.games_added, report.duration_ms
                )?;
            }
        }
        Command::ScanSteam => {
            let added = shelf.platforms().scan_steam(&mut shelf.store)?;
            writeln!(out, "Added {} Steam games", added)?;
        }
        Command::ScanEpic => {
            let added = shelf.platforms().scan_epic(&mut shelf.store)?;
            writeln!(out, "Added {} Epic games", added)?;
        }
        Command::Run { id } => {
            let target = shelf.executor.resolve(&shelf.store, id)?;
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let outcome = shelf.executor.run_async(&target, cancel).await;
            watcher.abort();

            match outcome? {
                LaunchOutcome::Exited => writeln!(out, "Game exited")?,
                LaunchOutcome::Detached => writeln!(out, "Opened {}", target)?,
                LaunchOutcome::Cancelled => writeln!(out, "Game stopped")?,
            }
        }
        Command::Music => {
            let dir = shelf.config.snapshot()?.music_dir;
            for track in list_music(&dir)? {
                writeln!(out, "{}", track)?;
            }
        }
        Command::Settings { set } => {
            let document = SettingsDocument::new(shelf.config.snapshot()?.settings_path);
            if let Some(file) = set {
                let contents = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let value: serde_json::Value = serde_json::from_str(&contents)
                    .with_context(|| format!("{} is not valid JSON", file.display()))?;
                document.save(&value)?;
                info!("Settings replaced from {}", file.display());
            }
            writeln!(out, "{}", serde_json::to_string_pretty(&document.load()?)?)?;
        }
        Command::Config { set, as_toml } => {
            if let Some(file) = set {
                let config = LauncherConfig::load(&file)
                    .with_context(|| format!("Failed to read configuration {}", file.display()))?;
                shelf.config.edit(config)?;
                info!("Configuration replaced from {}", file.display());
            }
            let config = shelf.config.snapshot()?;
            let text = if as_toml {
                toml::to_string_pretty(&config)?
            } else {
                serde_json::to_string_pretty(&config)?
            };
            writeln!(out, "{}", text)?;
        }
    }

    Ok(())
}
