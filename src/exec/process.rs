// src/exec/process.rs

//! Spawning one command, pumping its pipes into a sink, and waiting for it
//! under a cancellation token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{LauncherError, Result};
use crate::exec::command::CommandSpec;
use crate::exec::tree;
use crate::sink::SharedSink;

/// How long output pumps may keep draining after a forced kill.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

static NEXT_RUN: AtomicU64 = AtomicU64::new(0);

/// Run `spec` to completion, or until `cancel` fires.
///
/// Returns `Some(exit_code)` on natural exit and `None` when the token was
/// cancelled first, in which case the process tree has been killed. Lines
/// written before exit are delivered to `sink` before this returns, unless
/// a background descendant keeps a pipe open past `DRAIN_GRACE` or past
/// cancellation. In the cancelled case the leftover descendants are killed
/// and the exit code is still reported.
pub async fn run_cancellable(
    spec: &CommandSpec,
    sink: SharedSink,
    cancel: CancellationToken,
) -> Result<Option<i32>> {
    info!(cmd = %spec, cwd = ?spec.working_dir(), "starting command");

    let tag = format!("{}-{}", std::process::id(), NEXT_RUN.fetch_add(1, Ordering::Relaxed));
    let mut child = spec
        .to_command()
        .env(tree::RUN_TAG_VAR, &tag)
        .spawn()
        .map_err(|source| LauncherError::Launch {
            program: spec.program().to_string(),
            source,
        })?;
    let pid = child.id();

    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(spawn_line_pump(stdout, sink.clone(), None));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(spawn_line_pump(stderr, sink.clone(), None));
    }

    // Either the process exits on its own, or the token fires and the
    // whole tree is taken down.
    tokio::select! {
        status_res = child.wait() => {
            let status = status_res?;
            let code = status.code().unwrap_or(-1);
            let aborts: Vec<_> = pumps.iter().map(JoinHandle::abort_handle).collect();
            tokio::select! {
                () = drain(pumps, DRAIN_GRACE) => {}
                () = cancel.cancelled() => {
                    warn!(cmd = %spec, "cancelled while output was still open; killing leftover processes");
                    tree::kill_tagged(&tag);
                    for abort in aborts {
                        abort.abort();
                    }
                }
            }
            info!(cmd = %spec, exit_code = code, success = status.success(), "command exited");
            Ok(Some(code))
        }

        () = cancel.cancelled() => {
            info!(cmd = %spec, pid = ?pid, "cancellation requested; killing process tree");
            if let Some(pid) = pid {
                tree::kill_tree(pid);
            }
            tree::kill_tagged(&tag);
            if let Err(e) = child.kill().await {
                debug!(cmd = %spec, error = %e, "kill after tree kill failed");
            }
            drain(pumps, DRAIN_GRACE).await;
            Ok(None)
        }
    }
}

/// Spawn a task that forwards each line of `reader` to `sink`.
///
/// Lines are decoded lossily so a stray non-UTF-8 byte never stalls the
/// pipe. `prefix` is prepended verbatim when present.
pub(crate) fn spawn_line_pump<R>(
    reader: R,
    sink: SharedSink,
    prefix: Option<&'static str>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim_end_matches(['\r', '\n']);
                    match prefix {
                        Some(prefix) => sink.report(&format!("{prefix}{line}")),
                        None => sink.report(line),
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output pipe read failed; stopping pump");
                    break;
                }
            }
        }
    })
}

/// Wait for pumps to finish, abandoning any still open after `grace`.
pub(crate) async fn drain(pumps: Vec<JoinHandle<()>>, grace: Duration) {
    for pump in pumps {
        let abort = pump.abort_handle();
        if tokio::time::timeout(grace, pump).await.is_err() {
            warn!("output pipe still open after grace period; abandoning");
            abort.abort();
        }
    }
}
