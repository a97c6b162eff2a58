// src/console.rs

//! Line-oriented operator console for a running fleet.
//!
//! ```text
//! <server> <text>   forward <text> to the server's stdin
//! :stats <server>   print uptime, memory and CPU time
//! :kill <server>    kill the server's process tree
//! :list             show tracked servers and whether they run
//! :quit             stop reading; the caller shuts everything down
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::errors::Result;
use crate::sink::SharedSink;
use crate::supervisor::{ProcessSupervisor, ServerKind, format, snapshot_lines};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Send { server: String, text: String },
    Stats(String),
    Kill(String),
    List,
    Quit,
    Empty,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ConsoleCommand::Empty);
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let needs_server = |cmd: &str| {
            if rest.is_empty() {
                Err(format!("usage: {cmd} <server>"))
            } else {
                Ok(canonical_name(rest))
            }
        };

        match head {
            ":quit" | ":q" => Ok(ConsoleCommand::Quit),
            ":list" => Ok(ConsoleCommand::List),
            ":stats" => needs_server(":stats").map(ConsoleCommand::Stats),
            ":kill" => needs_server(":kill").map(ConsoleCommand::Kill),
            cmd if cmd.starts_with(':') => Err(format!("unknown command: {cmd}")),
            server if rest.is_empty() => Err(format!("nothing to send to {server}")),
            server => Ok(ConsoleCommand::Send {
                server: canonical_name(server),
                text: rest.to_string(),
            }),
        }
    }
}

/// Fleet names are matched case-insensitively; anything else verbatim.
fn canonical_name(raw: &str) -> String {
    raw.parse::<ServerKind>()
        .map(|kind| kind.name().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Read commands from `input` until `:quit` or end of input.
///
/// Per-command failures (unknown server, exited process) are reported to
/// `sink` and do not end the loop.
pub async fn run_console<R>(supervisor: &ProcessSupervisor, input: R, sink: SharedSink) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(msg) => {
                sink.report(&msg);
                continue;
            }
        };
        debug!(?command, "console command");

        let outcome = match command {
            ConsoleCommand::Empty => Ok(()),
            ConsoleCommand::Quit => return Ok(()),
            ConsoleCommand::List => {
                for name in supervisor.names().await {
                    let state = match supervisor.get(&name).await {
                        Ok(p) if p.is_running() => format!("running (PID {})", p.pid()),
                        Ok(p) => format!("exited ({})", p.exit_code().unwrap_or(-1)),
                        Err(_) => continue,
                    };
                    sink.report(&format!("{name}: {state}"));
                }
                Ok(())
            }
            ConsoleCommand::Send { server, text } => supervisor.send(&server, &text).await,
            ConsoleCommand::Stats(server) => {
                supervisor.inspect(&server).await.map(|stats| {
                    for line in snapshot_lines(&stats) {
                        sink.report(&format::log_line(&server, "INF", &line));
                    }
                })
            }
            ConsoleCommand::Kill(server) => supervisor.kill(&server, sink.clone()).await,
        };

        if let Err(e) = outcome {
            sink.report(&format!("[ERR] {e}"));
        }
    }
    Ok(())
}
