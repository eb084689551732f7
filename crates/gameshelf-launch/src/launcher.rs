//! Game launcher

use crate::{LaunchError, LaunchTarget};
use gameshelf_config::LauncherConfig;
use gameshelf_library::CatalogStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A started launch
#[derive(Debug)]
pub enum Launched {
    /// Handed to the URI opener; the launcher owns the game from here
    Detached { uri: String },
    /// Executable running as our child
    Process(GameProcess),
}

/// How an awaited launch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Exited,
    Detached,
    Cancelled,
}

/// Running game executable
#[derive(Debug)]
pub struct GameProcess {
    child: Child,
    path: PathBuf,
}

impl GameProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the game exits; a non-zero status is an error
    pub fn wait(mut self) -> Result<(), LaunchError> {
        let status = self.child.wait()?;
        check_exit(status, &self.path)
    }

    pub fn kill(&mut self) -> Result<(), LaunchError> {
        self.child.kill()?;
        // Reap so no zombie is left behind
        self.child.wait()?;
        Ok(())
    }
}

/// Starts games from the catalog
#[derive(Debug, Clone)]
pub struct LaunchExecutor {
    /// Recognized URI schemes, lowercase
    schemes: Vec<String>,
}

impl Default for LaunchExecutor {
    fn default() -> Self {
        Self::from_config(&LauncherConfig::default())
    }
}

impl LaunchExecutor {
    /// Create a launcher recognizing the default schemes
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &LauncherConfig) -> Self {
        Self::with_schemes(config.uri_schemes.iter().cloned())
    }

    /// Create with custom URI schemes
    pub fn with_schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemes: schemes
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
        }
    }

    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    pub fn classify(&self, text: &str) -> LaunchTarget {
        LaunchTarget::classify(text, &self.schemes)
    }

    /// Look up a game's launch target
    pub fn resolve(&self, store: &CatalogStore, id: i64) -> Result<LaunchTarget, LaunchError> {
        let game = store.get(id)?.ok_or(LaunchError::GameNotFound(id))?;
        Ok(self.classify(&game.launch_target))
    }

    /// Start a game without waiting for it
    pub fn spawn(&self, store: &CatalogStore, id: i64) -> Result<Launched, LaunchError> {
        let target = self.resolve(store, id)?;
        self.spawn_target(&target)
    }

    pub fn spawn_target(&self, target: &LaunchTarget) -> Result<Launched, LaunchError> {
        match target {
            LaunchTarget::Uri { uri, scheme } => {
                info!("Opening {} URI {}", scheme, uri);
                open_uri(uri)?;
                Ok(Launched::Detached { uri: uri.clone() })
            }
            LaunchTarget::Path(path) => {
                let (mut cmd, path) = executable_command(path)?;
                info!("Launching {}", path.display());

                let child = cmd
                    .spawn()
                    .map_err(|e| LaunchError::SpawnFailed(format!("{}: {}", path.display(), e)))?;
                debug!("Started {} as pid {}", path.display(), child.id());

                Ok(Launched::Process(GameProcess { child, path }))
            }
        }
    }

    /// Launch a game and, for executables, wait for it to exit
    pub fn run(&self, store: &CatalogStore, id: i64) -> Result<(), LaunchError> {
        let target = self.resolve(store, id)?;
        self.run_target(&target)
    }

    pub fn run_target(&self, target: &LaunchTarget) -> Result<(), LaunchError> {
        match self.spawn_target(target)? {
            Launched::Detached { .. } => Ok(()),
            Launched::Process(process) => {
                let path = process.path().to_path_buf();
                process.wait()?;
                info!("{} exited", path.display());
                Ok(())
            }
        }
    }

    /// Launch a target and wait for it asynchronously
    ///
    /// Cancelling the token kills a running executable. URI launches return
    /// as soon as the opener has been started.
    pub async fn run_async(
        &self,
        target: &LaunchTarget,
        cancel: CancellationToken,
    ) -> Result<LaunchOutcome, LaunchError> {
        let path = match target {
            LaunchTarget::Uri { .. } => {
                self.spawn_target(target)?;
                return Ok(LaunchOutcome::Detached);
            }
            LaunchTarget::Path(path) => path,
        };

        let (cmd, path) = executable_command(path)?;
        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);

        info!("Launching {}", path.display());
        let mut child = cmd
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed(format!("{}: {}", path.display(), e)))?;

        tokio::select! {
            status = child.wait() => {
                check_exit(status?, &path)?;
                info!("{} exited", path.display());
                Ok(LaunchOutcome::Exited)
            }
            _ = cancel.cancelled() => {
                warn!("Launch of {} cancelled, stopping game", path.display());
                child.kill().await?;
                Ok(LaunchOutcome::Cancelled)
            }
        }
    }
}

/// Command for an executable, run from its own directory
fn executable_command(path: &Path) -> Result<(Command, PathBuf), LaunchError> {
    let path = fs::canonicalize(path).map_err(|_| LaunchError::TargetNotFound(path.to_path_buf()))?;
    if !path.is_file() {
        return Err(LaunchError::TargetNotFound(path));
    }

    let mut cmd = Command::new(&path);
    if let Some(dir) = path.parent() {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());

    Ok((cmd, path))
}

/// Hand a URI to the platform's opener without waiting on it
fn open_uri(uri: &str) -> Result<(), LaunchError> {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    };

    let opener = which::which(program)
        .map_err(|e| LaunchError::SpawnFailed(format!("URI opener {} unavailable: {}", program, e)))?;

    Command::new(opener)
        .args(args)
        .arg(uri)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| LaunchError::SpawnFailed(format!("{}: {}", uri, e)))?;

    Ok(())
}

fn check_exit(status: ExitStatus, path: &Path) -> Result<(), LaunchError> {
    if status.success() {
        Ok(())
    } else {
        Err(LaunchError::NonZeroExit {
            path: path.to_path_buf(),
            code: status.code(),
        })
    }
}
