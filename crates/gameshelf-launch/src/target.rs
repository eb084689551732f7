//! Launch target classification

use std::fmt;
use std::path::PathBuf;

/// What a stored launch target names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    /// Launcher action such as `steam://rungameid/570`
    Uri { scheme: String, uri: String },
    /// Executable on disk
    Path(PathBuf),
}

impl LaunchTarget {
    /// Classify `text` against the recognized URI schemes
    ///
    /// Only `scheme://` prefixes with a listed scheme count, so Windows drive
    /// letters and unknown schemes fall through to paths.
    pub fn classify(text: &str, schemes: &[String]) -> Self {
        let text = text.trim();
        if let Some((scheme, _)) = text.split_once("://") {
            let scheme = scheme.to_lowercase();
            if schemes.iter().any(|s| s.eq_ignore_ascii_case(&scheme)) {
                return LaunchTarget::Uri {
                    scheme,
                    uri: text.to_string(),
                };
            }
        }

        LaunchTarget::Path(PathBuf::from(text))
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, LaunchTarget::Uri { .. })
    }
}

impl fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchTarget::Uri { uri, .. } => write!(f, "{}", uri),
            LaunchTarget::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schemes() -> Vec<String> {
        vec!["steam".to_string(), "com.epicgames.launcher".to_string()]
    }

    #[test]
    fn test_steam_uri() {
        let target = LaunchTarget::classify("steam://rungameid/570", &schemes());
        assert_eq!(
            target,
            LaunchTarget::Uri {
                scheme: "steam".to_string(),
                uri: "steam://rungameid/570".to_string(),
            }
        );
        assert!(target.is_uri());
    }

    #[test]
    fn test_scheme_case_insensitive() {
        let target = LaunchTarget::classify(
            "com.EpicGames.Launcher://apps/Fortnite?action=launch",
            &schemes(),
        );
        assert!(target.is_uri());
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            LaunchTarget::classify("C:\\Games\\Doom\\doom.exe", &schemes()),
            LaunchTarget::Path(PathBuf::from("C:\\Games\\Doom\\doom.exe"))
        );
        assert!(!LaunchTarget::classify("/usr/games/quake", &schemes()).is_uri());
        // Unrecognized scheme is treated as a path
        assert!(!LaunchTarget::classify("ftp://host/game.exe", &schemes()).is_uri());
    }

    #[test]
    fn test_display() {
        let target = LaunchTarget::classify("steam://run/1", &schemes());
        assert_eq!(target.to_string(), "steam://run/1");
    }
}
