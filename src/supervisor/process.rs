// src/supervisor/process.rs

//! A single supervised long-running child process.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{LauncherError, Result};
use crate::exec::process::{drain, spawn_line_pump};
use crate::exec::tree;
use crate::sink::SharedSink;
use crate::supervisor::format;
use crate::supervisor::servers::LaunchSpec;

/// How long output pumps may keep draining after the child exits.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Prefix applied to stderr lines of supervised processes.
pub const STDERR_PREFIX: &str = "[ERR] ";

/// Point-in-time resource snapshot of a running process.
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub name: String,
    pub pid: u32,
    pub started_at: DateTime<Local>,
    pub uptime: Duration,
    pub memory_bytes: u64,
    pub cpu_time: Duration,
}

/// Handle to a supervised process.
///
/// Cheap to clone; all clones observe the same exit code and share one
/// stdin pipe. The exit code is set exactly once, by the background
/// monitor, after the OS confirms termination.
#[derive(Clone)]
pub struct ManagedProcess {
    name: String,
    pid: u32,
    started_at: DateTime<Local>,
    started: Instant,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    exit: watch::Receiver<Option<i32>>,
    kill: CancellationToken,
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .field("started_at", &self.started_at)
            .field("exit_code", &self.exit_code())
            .finish_non_exhaustive()
    }
}

impl ManagedProcess {
    /// Start `spec.executable` with all three pipes attached and hand the
    /// child to a background monitor.
    pub(crate) fn spawn(name: &str, spec: &LaunchSpec, sink: SharedSink) -> Result<Self> {
        let mut cmd = Command::new(spec.executable());
        cmd.args(spec.arguments())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = spec.working_dir() {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| LauncherError::Launch {
            program: spec.executable().display().to_string(),
            source,
        })?;
        let pid = child.id().unwrap_or_default();

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(spawn_line_pump(stdout, sink.clone(), None));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(spawn_line_pump(stderr, sink.clone(), Some(STDERR_PREFIX)));
        }

        let stdin = Arc::new(Mutex::new(child.stdin.take()));
        let (exit_tx, exit_rx) = watch::channel(None);
        let kill = CancellationToken::new();

        info!(%name, pid, exe = %spec.executable().display(), "server process started");

        tokio::spawn(monitor(
            name.to_string(),
            child,
            pid,
            pumps,
            kill.clone(),
            Arc::clone(&stdin),
            exit_tx,
            sink,
        ));

        Ok(Self {
            name: name.to_string(),
            pid,
            started_at: Local::now(),
            started: Instant::now(),
            stdin,
            exit: exit_rx,
            kill,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Exit code, once the process has terminated.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.exit_code().is_none()
    }

    /// Write one line to the process's stdin.
    pub async fn send_line(&self, line: &str) -> Result<()> {
        if !self.is_running() {
            return Err(LauncherError::NotRunning(self.name.clone()));
        }

        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return Err(LauncherError::NotRunning(self.name.clone()));
        };

        let mut payload = line.trim_end_matches(['\r', '\n']).to_string();
        payload.push('\n');
        let written = async {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            debug!(name = %self.name, error = %e, "stdin write failed; treating process as gone");
            guard.take();
            return Err(LauncherError::NotRunning(self.name.clone()));
        }
        Ok(())
    }

    /// Resource snapshot; `NotRunning` once the process has exited.
    pub async fn stats(&self) -> Result<ProcessStats> {
        if !self.is_running() {
            return Err(LauncherError::NotRunning(self.name.clone()));
        }

        let pid = self.pid;
        let sample = tokio::task::spawn_blocking(move || tree::sample(pid))
            .await
            .map_err(anyhow::Error::from)?
            .ok_or_else(|| LauncherError::NotRunning(self.name.clone()))?;

        Ok(ProcessStats {
            name: self.name.clone(),
            pid,
            started_at: self.started_at,
            uptime: self.uptime(),
            memory_bytes: sample.memory_bytes,
            cpu_time: sample.cpu_time,
        })
    }

    /// Ask the monitor to kill the process tree. Returns immediately.
    pub fn request_kill(&self) {
        self.kill.cancel();
    }

    /// Resolve with the exit code once the OS confirms termination.
    pub async fn wait(&self) -> i32 {
        let mut rx = self.exit.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(code) => code.unwrap_or(-1),
            // Monitor vanished without reporting; nothing left to wait for.
            Err(_) => -1,
        }
    }
}

/// Owns the child until it exits, then publishes the exit code.
#[allow(clippy::too_many_arguments)]
async fn monitor(
    name: String,
    mut child: Child,
    pid: u32,
    pumps: Vec<JoinHandle<()>>,
    kill: CancellationToken,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    exit_tx: watch::Sender<Option<i32>>,
    sink: SharedSink,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        () = kill.cancelled() => {
            info!(%name, pid, "kill requested; terminating process tree");
            tree::kill_tree(pid);
            if let Err(e) = child.kill().await {
                debug!(%name, error = %e, "kill after tree kill failed");
            }
            child.wait().await
        }
    };

    stdin.lock().await.take();
    drain(pumps, DRAIN_GRACE).await;

    let code = match status {
        Ok(status) => status.code().unwrap_or(-1),
        Err(e) => {
            warn!(%name, error = %e, "failed to collect exit status");
            -1
        }
    };

    info!(%name, pid, exit_code = code, "server process exited");
    sink.report(&format::log_line(
        &name,
        "INF",
        &format!(
            "Exited code {code} at {}",
            Local::now().format("%H:%M:%S%.3f")
        ),
    ));
    let _ = exit_tx.send(Some(code));
}
