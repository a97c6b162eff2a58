// src/config/env_file.rs

//! Line-oriented `KEY=VALUE` store (`.env`) inside the install root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{LauncherError, Result};

pub const ENV_FILE_NAME: &str = ".env";
pub const ENV_TEMPLATE_NAME: &str = ".env.example";

pub const DB_IP: &str = "DB_IP";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const MS2_DATA_FOLDER: &str = "MS2_DATA_FOLDER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `.env` inside `install_root`, without touching the filesystem.
    pub fn in_root(install_root: &Path) -> Self {
        Self::at(install_root.join(ENV_FILE_NAME))
    }

    /// Make sure `.env` exists, copying it from `.env.example` if needed.
    ///
    /// Fails with `Config` when neither file is present.
    pub fn ensure(install_root: &Path) -> Result<Self> {
        let env = Self::in_root(install_root);
        let template = install_root.join(ENV_TEMPLATE_NAME);

        if !env.path.exists() && template.exists() {
            fs::copy(&template, &env.path)?;
            info!(path = %env.path.display(), "bootstrapped .env from template");
        }

        if !env.path.exists() {
            return Err(LauncherError::Config(format!(
                "neither {ENV_FILE_NAME} nor {ENV_TEMPLATE_NAME} found in {}",
                install_root.display()
            )));
        }

        Ok(env)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All `KEY=VALUE` pairs; lines without `=` are ignored and the first
    /// occurrence of a key wins. A missing file reads as empty.
    pub fn read(&self) -> Result<BTreeMap<String, String>> {
        let mut values = BTreeMap::new();
        if !self.path.exists() {
            return Ok(values);
        }

        for line in fs::read_to_string(&self.path)?.lines() {
            if let Some((key, value)) = line.split_once('=') {
                values
                    .entry(key.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        Ok(values)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    /// Replace the first line whose key matches case-insensitively, or
    /// append a new line. Other lines are preserved verbatim.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut lines: Vec<String> = if self.path.exists() {
            fs::read_to_string(&self.path)?
                .lines()
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        let entry = format!("{key}={value}");
        let existing = lines.iter().position(|line| {
            line.split_once('=')
                .is_some_and(|(k, _)| k.eq_ignore_ascii_case(key))
        });
        match existing {
            Some(idx) => lines[idx] = entry,
            None => lines.push(entry),
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut contents = lines.join("\n");
        contents.push('\n');
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Database settings; missing keys read as empty strings.
    pub fn db_settings(&self) -> Result<DbSettings> {
        let mut values = self.read()?;
        let mut take = |key: &str| values.remove(key).unwrap_or_default();
        Ok(DbSettings {
            host: take(DB_IP),
            port: take(DB_PORT),
            user: take(DB_USER),
            password: take(DB_PASSWORD),
        })
    }

    pub fn save_db_settings(&self, settings: &DbSettings) -> Result<()> {
        self.set(DB_IP, &settings.host)?;
        self.set(DB_PORT, &settings.port)?;
        self.set(DB_USER, &settings.user)?;
        self.set(DB_PASSWORD, &settings.password)
    }
}

/// Connection settings for the game database.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DbSettings {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
}

impl DbSettings {
    pub fn port_number(&self) -> Result<u16> {
        self.port
            .trim()
            .parse()
            .map_err(|_| LauncherError::Config(format!("invalid {DB_PORT}: {:?}", self.port)))
    }
}

impl std::fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
