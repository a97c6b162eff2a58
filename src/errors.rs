// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by errors that wrap a foreign failure.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of a clone-or-pull decision failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Clone,
    Pull,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Clone => f.write_str("clone"),
            SyncPhase::Pull => f.write_str("pull"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LauncherError {
    /// The executable could not be started (missing, permission denied, ...).
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A command ran but its exit code is fatal for the calling workflow.
    #[error("`{program}` exited with code {code}")]
    CommandFailed { program: String, code: i32 },

    #[error("remote repository is not reachable: {0}")]
    Unreachable(String),

    /// First failure among a batch of concurrent downloads.
    #[error("failed to fetch `{name}`: {source}")]
    Fetch {
        name: String,
        #[source]
        source: Cause,
    },

    #[error("git {phase} failed: {source}")]
    Sync {
        phase: SyncPhase,
        #[source]
        source: Box<LauncherError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("database check failed: {0}")]
    Database(String),

    #[error("build of `{name}` failed: {source}")]
    Build {
        name: String,
        #[source]
        source: Box<LauncherError>,
    },

    #[error("executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("no process named `{0}` is tracked")]
    NotFound(String),

    #[error("process `{0}` is not running")]
    NotRunning(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LauncherError {
    pub(crate) fn sync(phase: SyncPhase, source: LauncherError) -> Self {
        LauncherError::Sync {
            phase,
            source: Box::new(source),
        }
    }

    pub(crate) fn build(name: &str, source: LauncherError) -> Self {
        LauncherError::Build {
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;
