//! Game launching for Gameshelf
//!
//! Resolves a catalog entry's launch target and starts it: launcher URIs go
//! through the platform's URI opener, executables run as child processes.

mod launcher;
mod target;

pub use launcher::{GameProcess, LaunchExecutor, LaunchOutcome, Launched};
pub use target::LaunchTarget;

use gameshelf_library::LibraryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("Executable not found: {0}")]
    TargetNotFound(PathBuf),

    #[error("Launch failed: {0}")]
    SpawnFailed(String),

    #[error("{} exited with {}", path.display(), exit_description(*code))]
    NonZeroExit { path: PathBuf, code: Option<i32> },

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    /// True for an unknown game or a missing executable
    pub fn is_not_found(&self) -> bool {
        match self {
            LaunchError::GameNotFound(_) | LaunchError::TargetNotFound(_) => true,
            LaunchError::Library(e) => e.is_not_found(),
            _ => false,
        }
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants() {
        assert!(LaunchError::GameNotFound(3).is_not_found());
        assert!(LaunchError::TargetNotFound(PathBuf::from("/x.exe")).is_not_found());
        assert!(LaunchError::Library(LibraryError::GameNotFound(1)).is_not_found());
        assert!(!LaunchError::SpawnFailed("boom".into()).is_not_found());
    }

    #[test]
    fn test_non_zero_exit_display() {
        let err = LaunchError::NonZeroExit {
            path: PathBuf::from("/games/a.exe"),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "/games/a.exe exited with status 2");

        let err = LaunchError::NonZeroExit {
            path: PathBuf::from("/games/a.exe"),
            code: None,
        };
        assert!(err.to_string().ends_with("a signal"));
    }
}
