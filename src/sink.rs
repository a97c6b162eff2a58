// src/sink.rs

//! Progress sinks: the only contract between the orchestration core and
//! whatever displays its output.
//!
//! Every streaming operation takes exactly one sink. Sinks are invoked from
//! background Tokio tasks (one per output pipe), so implementations must be
//! `Send + Sync`. A UI that owns its own event loop should use
//! [`ChannelSink`] and drain the receiver on that loop.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::info;

/// Consumer of ordered text lines produced by a running operation.
pub trait ProgressSink: Send + Sync {
    fn report(&self, line: &str);
}

/// Shared, type-erased sink handle passed into runners.
pub type SharedSink = Arc<dyn ProgressSink>;

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, line: &str) {
        self(line)
    }
}

/// Forwards lines to `tracing` at INFO, tagged with a scope.
#[derive(Debug, Clone)]
pub struct TracingSink {
    scope: String,
}

impl TracingSink {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn shared(scope: impl Into<String>) -> SharedSink {
        Arc::new(Self::new(scope))
    }
}

impl ProgressSink for TracingSink {
    fn report(&self, line: &str) {
        info!(target: "maple2_launcher::output", scope = %self.scope, "{line}");
    }
}

/// Prints lines to stdout, optionally prefixed (e.g. `[World]`).
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    prefix: Option<String>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn report(&self, line: &str) {
        match &self.prefix {
            Some(prefix) => println!("[{prefix}] {line}"),
            None => println!("{line}"),
        }
    }
}

/// Marshals lines onto a channel drained by the consumer's own loop.
///
/// Lines reported after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, line: &str) {
        let _ = self.tx.send(line.to_string());
    }
}

/// Collects every line in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines reported so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl ProgressSink for MemorySink {
    fn report(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut guard) => guard.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
    }
}

/// Delivers every line to two sinks, left first.
pub struct TeeSink {
    left: SharedSink,
    right: SharedSink,
}

impl TeeSink {
    pub fn new(left: SharedSink, right: SharedSink) -> Self {
        Self { left, right }
    }
}

impl ProgressSink for TeeSink {
    fn report(&self, line: &str) {
        self.left.report(line);
        self.right.report(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tee_delivers_to_both_sides_in_order() {
        let a = MemorySink::new();
        let b = MemorySink::new();
        let tee = TeeSink::new(Arc::new(a.clone()), Arc::new(b.clone()));

        tee.report("one");
        tee.report("two");

        assert_eq!(a.lines(), vec!["one", "two"]);
        assert_eq!(b.lines(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn channel_sink_marshals_lines_to_receiver() {
        let (sink, mut rx) = ChannelSink::channel();
        let shared: SharedSink = Arc::new(sink);

        let handle = tokio::spawn(async move {
            shared.report("from background");
        });
        handle.await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("from background"));
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |line: &str| captured.lock().unwrap().push(line.len());

        sink.report("abc");
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }
}
