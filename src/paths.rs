//! XDG-compliant path resolution for loregraph.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(lore::paths::no_home),
        help("Set the HOME environment variable, or pass --config explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(lore::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

const APP_DIR: &str = "loregraph";
const CONFIG_FILE: &str = "config.toml";

/// Global directories for loregraph.
#[derive(Debug, Clone)]
pub struct LorePaths {
    /// `$XDG_CONFIG_HOME/loregraph/`
    pub config_dir: PathBuf,
}

impl LorePaths {
    /// Resolve from `XDG_CONFIG_HOME`, falling back to `$HOME/.config`.
    pub fn resolve() -> PathResult<Self> {
        let base = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .map_err(|_| PathError::NoHome)?,
        };
        Ok(Self::with_config_base(base))
    }

    /// Layout rooted at an explicit config base directory.
    pub fn with_config_base(base: impl AsRef<Path>) -> Self {
        Self {
            config_dir: base.as_ref().join(APP_DIR),
        }
    }

    /// Path to the pipeline config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Create the config directory. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        std::fs::create_dir_all(&self.config_dir).map_err(|e| PathError::CreateDir {
            path: self.config_dir.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_under_app_dir() {
        let paths = LorePaths::with_config_base("/cfg");
        assert_eq!(paths.config_dir, PathBuf::from("/cfg/loregraph"));
        assert_eq!(paths.config_file(), PathBuf::from("/cfg/loregraph/config.toml"));
    }

    #[test]
    fn resolved_paths_name_the_app() {
        // Reads the real environment; mutating env vars is unsafe in edition 2024.
        if let Ok(paths) = LorePaths::resolve() {
            assert!(paths.config_dir.ends_with(APP_DIR));
        }
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = LorePaths::with_config_base(dir.path());
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.config_dir.is_dir());
    }
}
