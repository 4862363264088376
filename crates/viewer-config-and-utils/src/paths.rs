//! File system paths for bus components.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Manages file system paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.viewer-bus)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.viewer-bus`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".viewer-bus"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.viewer-bus/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the logs directory (~/.viewer-bus/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the structured log file (~/.viewer-bus/logs/bus.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("bus.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
