// src/repo/mod.rs

//! Git repository reconciliation: clone-or-pull decided from local state.
//!
//! [`inspect`] classifies a directory into a [`RepoState`]; [`RepoSync`]
//! maps that state to a [`SyncAction`] and executes it through a
//! `CommandRunner`. The state is recomputed on every call, never cached.
//!
//! The reachability probe ([`RepoSync::can_reach_remote`]) is deliberately
//! separate from `sync`: callers compose the two.

pub mod submodule;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::errors::{LauncherError, Result, SyncPhase};
use crate::exec::{CommandRunner, CommandSpec, RunOutcome};
use crate::sink::{MemorySink, SharedSink, TracingSink};

pub use submodule::{SubmoduleState, SubmoduleStatus};

/// Name of the git metadata directory.
const GIT_DIR: &str = ".git";

/// Source-control state of a directory at the moment of inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    /// Not a checkout and not empty: foreign content, leave it alone.
    NotACheckout,
    /// Not a checkout and nothing inside (or not created yet).
    EmptyDirectory,
    /// Contains `.git`, regardless of what else is there.
    ExistingCheckout,
}

/// What `sync` decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Clone,
    Pull,
    Skip,
}

impl RepoState {
    pub fn action(self) -> SyncAction {
        match self {
            RepoState::EmptyDirectory => SyncAction::Clone,
            RepoState::ExistingCheckout => SyncAction::Pull,
            RepoState::NotACheckout => SyncAction::Skip,
        }
    }
}

/// Classify `dir`. A directory that does not exist counts as empty.
pub fn inspect(dir: &Path) -> Result<RepoState> {
    if dir.join(GIT_DIR).is_dir() {
        return Ok(RepoState::ExistingCheckout);
    }
    if !dir.exists() {
        return Ok(RepoState::EmptyDirectory);
    }
    let mut entries = std::fs::read_dir(dir)?;
    if entries.next().is_none() {
        Ok(RepoState::EmptyDirectory)
    } else {
        Ok(RepoState::NotACheckout)
    }
}

/// Clone-or-pull driver over a `CommandRunner`.
#[derive(Clone)]
pub struct RepoSync {
    runner: Arc<dyn CommandRunner>,
}

impl RepoSync {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `git ls-remote --heads <url>` within `timeout`; true only if it
    /// exits 0 before the deadline. Launch failures count as unreachable.
    pub async fn can_reach_remote(&self, url: &str, timeout: Option<Duration>) -> bool {
        let spec = CommandSpec::new("git").args(["ls-remote", "--heads", url]);
        match self
            .runner
            .run_bounded(spec, TracingSink::shared("ls-remote"), timeout)
            .await
        {
            Ok(RunOutcome::Exited(0)) => true,
            Ok(outcome) => {
                debug!(%url, ?outcome, "remote probe failed");
                false
            }
            Err(e) => {
                debug!(%url, error = %e, "remote probe could not start");
                false
            }
        }
    }

    /// [`can_reach_remote`](Self::can_reach_remote) as an error.
    pub async fn ensure_reachable(&self, url: &str, timeout: Option<Duration>) -> Result<()> {
        if self.can_reach_remote(url, timeout).await {
            Ok(())
        } else {
            Err(LauncherError::Unreachable(url.to_string()))
        }
    }

    /// Bring `dir` in line with `url`: clone into an empty directory, pull
    /// an existing checkout, skip anything else. `dir` is created first if
    /// it does not exist.
    pub async fn sync(&self, url: &str, dir: &Path, sink: SharedSink) -> Result<SyncAction> {
        tokio::fs::create_dir_all(dir).await?;

        let state = inspect(dir)?;
        let action = state.action();
        info!(dir = %dir.display(), ?state, ?action, "repository sync decision");

        match action {
            SyncAction::Clone => self.clone_into(url, dir, sink).await?,
            SyncAction::Pull => self.pull(dir, sink).await?,
            SyncAction::Skip => {
                sink.report("Directory isn't empty and not a Git repo; skipping clone.");
            }
        }
        Ok(action)
    }

    /// Recursive clone (with submodules) into `dir`.
    pub async fn clone_into(&self, url: &str, dir: &Path, sink: SharedSink) -> Result<()> {
        sink.report("→ Cloning repository (with submodules)...");
        let spec = CommandSpec::new("git")
            .args(["clone", "--recursive", url, "."])
            .current_dir(dir);
        self.run_git(spec, sink.clone(), SyncPhase::Clone).await?;
        sink.report("✔ Cloned successfully.");
        Ok(())
    }

    /// Fast-forward update of the checkout in `dir`.
    pub async fn pull(&self, dir: &Path, sink: SharedSink) -> Result<()> {
        sink.report("→ Pulling latest changes...");
        let spec = CommandSpec::new("git").arg("pull").current_dir(dir);
        self.run_git(spec, sink.clone(), SyncPhase::Pull).await?;
        sink.report("✔ Up to date.");
        Ok(())
    }

    /// `git submodule status --recursive`, parsed line by line.
    pub async fn submodule_status(&self, dir: &Path) -> Result<Vec<SubmoduleStatus>> {
        let spec = CommandSpec::new("git")
            .args(["submodule", "status", "--recursive"])
            .current_dir(dir);
        let captured = MemorySink::new();
        let code = self.runner.run(spec, Arc::new(captured.clone())).await?;
        if code != 0 {
            return Err(LauncherError::CommandFailed {
                program: "git submodule status".into(),
                code,
            });
        }
        Ok(captured
            .lines()
            .iter()
            .filter_map(|line| SubmoduleStatus::parse(line))
            .collect())
    }

    async fn run_git(&self, spec: CommandSpec, sink: SharedSink, phase: SyncPhase) -> Result<()> {
        let program = spec.to_string();
        let code = self
            .runner
            .run(spec, sink)
            .await
            .map_err(|e| LauncherError::sync(phase, e))?;
        if code != 0 {
            return Err(LauncherError::sync(
                phase,
                LauncherError::CommandFailed { program, code },
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = inspect(&dir.path().join("not-yet")).unwrap();
        assert_eq!(state, RepoState::EmptyDirectory);
    }

    #[test]
    fn git_dir_wins_over_other_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(GIT_DIR)).unwrap();
        std::fs::write(dir.path().join("README.md"), "x").unwrap();

        assert_eq!(inspect(dir.path()).unwrap(), RepoState::ExistingCheckout);
    }

    #[test]
    fn foreign_content_is_not_a_checkout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let state = inspect(dir.path()).unwrap();
        assert_eq!(state, RepoState::NotACheckout);
        assert_eq!(state.action(), SyncAction::Skip);
    }

    #[test]
    fn git_file_is_not_a_checkout_marker() {
        // Worktrees use a `.git` file; only a metadata directory counts here.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(GIT_DIR), "gitdir: elsewhere").unwrap();

        assert_eq!(inspect(dir.path()).unwrap(), RepoState::NotACheckout);
    }
}
