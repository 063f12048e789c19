// Settings
// Optional YAML configuration file with defaults for every run option

use crate::error::{ServiceError, ServiceResult};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default number of repositories processed at the same time
pub const DEFAULT_JOBS: usize = 16;

/// Default remote used by fetch, default-branch and merge steps
pub const DEFAULT_REMOTE: &str = "origin";

/// How much of the remote to fetch before inspecting a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchScope {
    /// Fetch every branch of the remote and prune deleted ones
    #[default]
    Prune,
    /// Fetch only the currently checked out branch
    Current,
    /// Work offline with whatever was fetched last time
    #[serde(alias = "none")]
    Skip,
}

impl FromStr for FetchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prune" | "all" => Ok(Self::Prune),
            "current" => Ok(Self::Current),
            "none" | "skip" => Ok(Self::Skip),
            other => Err(format!(
                "unknown fetch scope '{}' (expected prune, current or none)",
                other
            )),
        }
    }
}

impl fmt::Display for FetchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Prune => "prune",
            Self::Current => "current",
            Self::Skip => "none",
        };
        f.write_str(s)
    }
}

/// Run options that can be persisted in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of repositories processed concurrently
    pub jobs: usize,
    /// Deadline for a single git invocation (None = no deadline)
    pub timeout_secs: Option<u64>,
    /// Remote name used by remote-aware steps
    pub remote: String,
    /// Fetch behaviour before inspecting repositories
    pub fetch: FetchScope,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            timeout_secs: None,
            remote: DEFAULT_REMOTE.to_string(),
            fetch: FetchScope::default(),
        }
    }
}

impl Settings {
    /// Location of the per-user configuration file, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("repostates").join("config.yaml"))
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> ServiceResult<Self> {
        if !path.exists() {
            tracing::debug!("No configuration file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ServiceError::io(path, e))?;
        Self::from_yaml(&content).map_err(|message| ServiceError::Config {
            path: path.display().to_string(),
            message,
        })
    }

    /// Load settings from the per-user configuration file
    pub fn load_default() -> ServiceResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse settings from YAML text; empty documents yield the defaults
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        if settings.jobs == 0 {
            return Err("jobs must be at least 1".to_string());
        }
        Ok(settings)
    }

    /// Per-invocation deadline
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
