// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::LauncherConfig;
use crate::errors::Result;

/// File name of the launcher config inside the project root.
pub const CONFIG_FILE_NAME: &str = "launcher.config.json";

/// Reads and writes `launcher.config.json` under a project root.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    project_root: PathBuf,
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let path = project_root.join(CONFIG_FILE_NAME);
        Self { project_root, path }
    }

    /// Store at an explicit file path; defaults resolve against its parent.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let project_root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        Self { project_root, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, or the defaults if the file does not exist yet.
    ///
    /// A file that exists but does not parse is an error rather than being
    /// silently replaced.
    pub fn load_or_default(&self) -> Result<LauncherConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no launcher config; using defaults");
            return Ok(LauncherConfig::default_for(&self.project_root));
        }

        let contents = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Write the config as indented JSON.
    pub fn save(&self, config: &LauncherConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "launcher config saved");
        Ok(())
    }
}
