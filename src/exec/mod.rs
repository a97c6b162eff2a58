// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running external commands using
//! `tokio::process::Command` and streaming their output into a
//! [`ProgressSink`](crate::sink::ProgressSink).
//!
//! - [`command`] holds the immutable `CommandSpec`.
//! - [`process`] spawns one command, pumps stdout/stderr line-by-line and
//!   waits for exit under a `CancellationToken`.
//! - [`backend`] provides the `CommandRunner` trait and the production
//!   `ProcessRunner`, whose bounded mode is a deadline-scoped token.
//! - [`tree`] kills process trees and samples memory / CPU time.

pub mod backend;
pub mod command;
pub mod process;
pub mod tree;

pub use backend::{CommandRunner, DEFAULT_TIMEOUT, ProcessRunner, RunFuture, RunOutcome};
pub use command::CommandSpec;
pub use process::run_cancellable;
