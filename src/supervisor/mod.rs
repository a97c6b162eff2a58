// src/supervisor/mod.rs

//! Supervision of long-running server processes.
//!
//! The registry (`name -> ManagedProcess`) is owned by [`ProcessSupervisor`]
//! behind a single mutex; every mutation goes through its methods and the
//! lock is never held across process I/O. Entries persist after exit until
//! they are replaced by a new launch or removed by [`ProcessSupervisor::clear`].
//!
//! Policies:
//! - launching under a name whose process is still running kills that
//!   process tree (and waits for it) before starting the replacement;
//! - `send`, `inspect` against an exited process fail with `NotRunning`;
//!   unknown names fail with `NotFound`;
//! - `kill` on an exited process is a no-op;
//! - `kill_all` never fails and never waits longer than [`SHUTDOWN_GRACE`].

pub mod format;
pub mod process;
pub mod servers;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{LauncherError, Result};
use crate::exec::CommandRunner;
use crate::sink::SharedSink;

pub use process::{ManagedProcess, ProcessStats};
pub use servers::{LaunchSpec, ServerKind};

/// Upper bound on how long shutdown waits for killed processes to exit.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on how long a relaunch waits for the old process to exit.
const REPLACE_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ProcessSupervisor {
    runner: Arc<dyn CommandRunner>,
    registry: Arc<Mutex<HashMap<String, ManagedProcess>>>,
}

impl ProcessSupervisor {
    /// `runner` executes the pre-launch build step.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build (when a build step is given), then start and register the
    /// process under `name`. Output goes to `sink`, stderr lines prefixed
    /// with `[ERR] `.
    pub async fn launch(
        &self,
        name: &str,
        spec: LaunchSpec,
        sink: SharedSink,
    ) -> Result<ManagedProcess> {
        if let Some(build) = spec.build().cloned() {
            sink.report(&format!("→ Building {name}..."));
            let program = build.to_string();
            let code = self
                .runner
                .run(build, sink.clone())
                .await
                .map_err(|e| LauncherError::build(name, e))?;
            if code != 0 {
                sink.report(&format!("[ERR] build of {name} exited with code {code}"));
                return Err(LauncherError::build(
                    name,
                    LauncherError::CommandFailed { program, code },
                ));
            }
        }

        if !spec.executable().is_file() {
            sink.report(&format!(
                "[ERR] Could not find {}",
                spec.executable().display()
            ));
            return Err(LauncherError::ExecutableNotFound(
                spec.executable().to_path_buf(),
            ));
        }

        self.retire(name).await;

        let process = ManagedProcess::spawn(name, &spec, sink.clone())?;
        let previous = self
            .registry
            .lock()
            .await
            .insert(name.to_string(), process.clone());

        // Another launch under the same name raced us; never orphan it.
        if let Some(previous) = previous.filter(ManagedProcess::is_running) {
            warn!(%name, pid = previous.pid(), "replacing concurrently launched process");
            previous.request_kill();
        }

        sink.report(&format!("✔ {name} started (PID {})", process.pid()));
        Ok(process)
    }

    /// Launch every [`ServerKind`] in order, each into its own sink.
    ///
    /// A failing server does not stop the others; results are returned in
    /// launch order.
    pub async fn launch_fleet<F>(
        &self,
        install_root: &Path,
        mut sink_for: F,
    ) -> Vec<(ServerKind, Result<ManagedProcess>)>
    where
        F: FnMut(ServerKind) -> SharedSink,
    {
        let mut results = Vec::with_capacity(ServerKind::ALL.len());
        for kind in ServerKind::ALL {
            let sink = sink_for(kind);
            let spec = LaunchSpec::for_server(kind, install_root);
            let result = self.launch(kind.name(), spec, sink.clone()).await;
            if let Err(e) = &result {
                warn!(server = %kind, error = %e, "server launch failed");
                sink.report(&format!("[ERR] {e}"));
            }
            results.push((kind, result));
        }
        results
    }

    /// Forward one line to the named process's stdin.
    pub async fn send(&self, name: &str, line: &str) -> Result<()> {
        self.get(name).await?.send_line(line).await
    }

    /// Uptime, memory and CPU time of a running process.
    pub async fn inspect(&self, name: &str) -> Result<ProcessStats> {
        self.get(name).await?.stats().await
    }

    /// Kill the named process tree.
    ///
    /// A snapshot (start time, uptime, memory, CPU) is written to `sink`
    /// before the kill is issued; the exit line follows asynchronously
    /// once the OS confirms termination.
    pub async fn kill(&self, name: &str, sink: SharedSink) -> Result<()> {
        let process = self.get(name).await?;
        if !process.is_running() {
            debug!(%name, "kill requested for exited process; nothing to do");
            return Ok(());
        }

        sink.report(&format::log_line(
            name,
            "WRN",
            &format!("Killing process {}", process.pid()),
        ));
        match process.stats().await {
            Ok(stats) => {
                for line in snapshot_lines(&stats) {
                    sink.report(&format::log_line(name, "INF", &line));
                }
            }
            Err(e) => debug!(%name, error = %e, "no resource snapshot before kill"),
        }

        process.request_kill();
        Ok(())
    }

    /// Best-effort termination of every tracked running process.
    ///
    /// Never fails: individual problems are logged. Returns once every
    /// process has exited or [`SHUTDOWN_GRACE`] has passed.
    pub async fn kill_all(&self) {
        let running: Vec<ManagedProcess> = self
            .registry
            .lock()
            .await
            .values()
            .filter(|p| p.is_running())
            .cloned()
            .collect();

        if running.is_empty() {
            return;
        }

        info!(count = running.len(), "killing all supervised processes");
        for process in &running {
            process.request_kill();
        }

        let exits = join_all(running.iter().map(ManagedProcess::wait));
        if tokio::time::timeout(SHUTDOWN_GRACE, exits).await.is_err() {
            let stuck: Vec<&str> = running
                .iter()
                .filter(|p| p.is_running())
                .map(ManagedProcess::name)
                .collect();
            warn!(?stuck, "processes still running after shutdown grace period");
        }
    }

    /// Kill everything, then forget every entry.
    pub async fn clear(&self) {
        self.kill_all().await;
        self.registry.lock().await.clear();
    }

    /// Wait for the named process to exit and return its exit code.
    pub async fn wait(&self, name: &str) -> Result<i32> {
        Ok(self.get(name).await?.wait().await)
    }

    pub async fn get(&self, name: &str) -> Result<ManagedProcess> {
        self.registry
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| LauncherError::NotFound(name.to_string()))
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.registry.lock().await.contains_key(name)
    }

    /// Tracked names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Kill and await a still-running process registered under `name`.
    async fn retire(&self, name: &str) {
        let Ok(existing) = self.get(name).await else {
            return;
        };
        if !existing.is_running() {
            return;
        }

        info!(%name, pid = existing.pid(), "relaunch requested; stopping previous instance");
        existing.request_kill();
        if tokio::time::timeout(REPLACE_GRACE, existing.wait())
            .await
            .is_err()
        {
            warn!(%name, pid = existing.pid(), "previous instance did not exit in time");
        }
    }
}

/// Started-at, uptime, memory and CPU lines for a snapshot.
pub fn snapshot_lines(stats: &ProcessStats) -> [String; 4] {
    [
        format!("Started at {}", stats.started_at.format("%H:%M:%S%.3f")),
        format!("Uptime   {}", format::duration(stats.uptime)),
        format!("Memory   {}", format::megabytes(stats.memory_bytes)),
        format!("CPU Time {}", format::duration(stats.cpu_time)),
    ]
}
