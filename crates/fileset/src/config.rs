use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FilesetError, Result};
use crate::walker::TreeScope;

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_IDLE_TTL_SECS: u64 = 600;

/// Settings for one managed root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesetConfig {
    pub root: PathBuf,
    /// Upper bound on any lock wait.
    pub lock_timeout_ms: u64,
    /// How long an unleased fileset stays in a registry.
    pub idle_ttl_secs: u64,
    /// Scope of the initial build.
    pub scope: TreeScope,
}

impl Default for FilesetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            idle_ttl_secs: DEFAULT_IDLE_TTL_SECS,
            scope: TreeScope::default(),
        }
    }
}

impl FilesetConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|error| {
            FilesetError::Config(format!(
                "failed to read config {}: {error}",
                path.display()
            ))
        })?;
        serde_json::from_str(&data).map_err(|error| {
            FilesetError::Config(format!(
                "failed to parse config {}: {error}",
                path.display()
            ))
        })
    }

    /// Reads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Replaces the scope of the initial build.
    pub fn with_scope(mut self, scope: TreeScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}
