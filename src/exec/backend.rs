// src/exec/backend.rs

//! Pluggable command-runner abstraction.
//!
//! Workflows talk to a `CommandRunner` instead of spawning processes
//! directly, so tests can substitute a scripted fake while production uses
//! [`ProcessRunner`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::Result;
use crate::exec::command::CommandSpec;
use crate::exec::process::run_cancellable;
use crate::sink::SharedSink;

/// Reference default for bounded runs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Boxed future returned by runner methods.
pub type RunFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Result of a bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited before the deadline with this code.
    Exited(i32),
    /// The deadline passed first; the process tree was killed.
    TimedOut,
}

impl RunOutcome {
    pub fn exit_code(self) -> Option<i32> {
        match self {
            RunOutcome::Exited(code) => Some(code),
            RunOutcome::TimedOut => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == RunOutcome::Exited(0)
    }
}

/// Trait abstracting how external commands are executed.
pub trait CommandRunner: Send + Sync {
    /// Run to completion with no deadline.
    ///
    /// A non-zero exit code is returned as `Ok`; only failure to start the
    /// executable is an error.
    fn run(&self, spec: CommandSpec, sink: SharedSink) -> RunFuture<'_, i32>;

    /// Run with a wall-clock deadline (`None` = the runner's default).
    fn run_bounded(
        &self,
        spec: CommandSpec,
        sink: SharedSink,
        timeout: Option<Duration>,
    ) -> RunFuture<'_, RunOutcome>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    default_timeout: Duration,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::with_default_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: CommandSpec, sink: SharedSink) -> RunFuture<'_, i32> {
        Box::pin(async move {
            // A token nobody cancels: the run ends only on natural exit.
            let code = run_cancellable(&spec, sink, CancellationToken::new()).await?;
            Ok(code.unwrap_or(-1))
        })
    }

    fn run_bounded(
        &self,
        spec: CommandSpec,
        sink: SharedSink,
        timeout: Option<Duration>,
    ) -> RunFuture<'_, RunOutcome> {
        let timeout = timeout.unwrap_or(self.default_timeout);

        Box::pin(async move {
            let token = CancellationToken::new();
            let deadline = {
                let token = token.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    token.cancel();
                })
            };

            let result = run_cancellable(&spec, sink, token).await;
            deadline.abort();

            match result? {
                Some(code) => Ok(RunOutcome::Exited(code)),
                None => {
                    warn!(cmd = %spec, ?timeout, "command timed out");
                    Ok(RunOutcome::TimedOut)
                }
            }
        })
    }
}
