//! Gameshelf
//!
//! Terminal front-end for the game catalog: one-shot subcommands for
//! scripting, and a menu for browsing and launching when run without one.

mod commands;
mod menu;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Command, Shelf};
use gameshelf_config::{ConfigHandle, LauncherConfig};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "gameshelf", version, about = "Game catalog and launcher")]
struct Cli {
    /// Configuration file (defaults to $GAMESHELF_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Where log output goes
enum LogTarget<'a> {
    Stderr,
    /// The menu owns the terminal, so logs go to a file
    File(&'a Path),
}

fn setup_logging(target: LogTarget<'_>) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match target {
        LogTarget::Stderr => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
    }

    Ok(())
}

/// Log file kept next to the catalog database
fn log_path(config: &LauncherConfig) -> PathBuf {
    config
        .db_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("gameshelf.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(LauncherConfig::default_path);
    let config = ConfigHandle::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
    let snapshot = config.snapshot()?;

    match cli.command {
        Some(command) => {
            setup_logging(LogTarget::Stderr)?;
            let mut shelf = Shelf::open(config)?;
            commands::execute(&mut shelf, command, &mut std::io::stdout()).await
        }
        None => {
            setup_logging(LogTarget::File(&log_path(&snapshot)))?;
            info!("Gameshelf starting with {}", config_path.display());

            let mut shelf = Shelf::open(config)?;
            if snapshot.scan_on_startup {
                shelf.startup_scan()?;
            }

            // The menu blocks on game processes, keep it off the async workers
            tokio::task::block_in_place(|| menu::run(shelf))?;

            info!("Gameshelf exiting");
            Ok(())
        }
    }
}
