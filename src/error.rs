//! Error types for entity fixing

use std::path::{Path, PathBuf};

/// Failures that stop a file, or the whole run, from being processed
#[derive(Debug)]
pub enum FixError {
    /// The entity directory does not exist
    MissingDirectory(PathBuf),
    /// Reading, writing or listing a path failed
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Configuration could not be loaded
    Config(config::ConfigError),
}

impl FixError {
    /// Adapter for `map_err` that attaches the path to an I/O error.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> FixError + '_ {
        move |source| FixError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl std::fmt::Display for FixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixError::MissingDirectory(path) => {
                write!(f, "Entity directory does not exist: {}", path.display())
            }
            FixError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            FixError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for FixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FixError::Io { source, .. } => Some(source),
            FixError::Config(e) => Some(e),
            FixError::MissingDirectory(_) => None,
        }
    }
}

impl From<config::ConfigError> for FixError {
    fn from(err: config::ConfigError) -> Self {
        FixError::Config(err)
    }
}

pub type Result<T> = std::result::Result<T, FixError>;
