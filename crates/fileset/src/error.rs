use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FilesetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sidecar error in {}: {message}", path.display())]
    Sidecar { path: PathBuf, message: String },

    #[error("Persistence error for {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Fileset not registered: {0}")]
    NotRegistered(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, FilesetError>;

/// Canonicalizes a path, returning the original if canonicalization fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

pub(crate) fn lock_timeout_error(what: &str, timeout: Duration) -> FilesetError {
    FilesetError::LockTimeout(format!(
        "{what} not acquired within {}ms",
        timeout.as_millis()
    ))
}

pub(crate) fn persistence_error(path: &Path, error: impl std::fmt::Display) -> FilesetError {
    FilesetError::Persistence {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

pub(crate) fn sidecar_error(path: &Path, error: impl std::fmt::Display) -> FilesetError {
    FilesetError::Sidecar {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
