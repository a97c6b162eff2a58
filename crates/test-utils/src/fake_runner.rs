use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use maple2_launcher::errors::LauncherError;
use maple2_launcher::exec::{CommandRunner, CommandSpec, RunFuture, RunOutcome};
use maple2_launcher::sink::SharedSink;

type Hook = Arc<dyn Fn(&CommandSpec) + Send + Sync>;

#[derive(Clone)]
enum Response {
    Exit { lines: Vec<String>, code: i32 },
    LaunchFailure,
    TimedOut,
}

#[derive(Clone)]
struct Script {
    pattern: String,
    response: Response,
    hook: Option<Hook>,
}

/// A scripted `CommandRunner` that:
/// - records every `CommandSpec` it is asked to run
/// - answers with the first script whose pattern is a substring of the
///   rendered command line (`git clone --recursive <url> .`)
/// - falls back to "exit 0, no output" when nothing matches.
///
/// A timeout script makes `run_bounded` report `TimedOut`; through plain
/// `run` it exits with `-1`.
#[derive(Default, Clone)]
pub struct FakeRunner {
    scripts: Arc<Mutex<Vec<Script>>>,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` exit with `code` and print nothing.
    pub fn on(self, pattern: &str, code: i32) -> Self {
        self.on_with_output(pattern, &[], code)
    }

    /// Commands containing `pattern` print `lines`, then exit with `code`.
    pub fn on_with_output(self, pattern: &str, lines: &[&str], code: i32) -> Self {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.push(pattern, Response::Exit { lines, code })
    }

    /// Commands containing `pattern` fail to start.
    pub fn on_launch_failure(self, pattern: &str) -> Self {
        self.push(pattern, Response::LaunchFailure)
    }

    /// Commands containing `pattern` never finish before the deadline.
    pub fn on_timeout(self, pattern: &str) -> Self {
        self.push(pattern, Response::TimedOut)
    }

    /// Attach a side effect to the most recently added script, run before
    /// it answers (e.g. create `.git` when a clone "succeeds").
    pub fn with_hook<F>(self, hook: F) -> Self
    where
        F: Fn(&CommandSpec) + Send + Sync + 'static,
    {
        if let Some(last) = self.scripts.lock().unwrap().last_mut() {
            last.hook = Some(Arc::new(hook));
        }
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Rendered command lines containing `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> Vec<String> {
        self.calls()
            .iter()
            .map(ToString::to_string)
            .filter(|line| line.contains(pattern))
            .collect()
    }

    fn push(self, pattern: &str, response: Response) -> Self {
        self.scripts.lock().unwrap().push(Script {
            pattern: pattern.to_string(),
            response,
            hook: None,
        });
        self
    }

    fn answer(&self, spec: &CommandSpec, sink: &SharedSink) -> Result<RunOutcome, LauncherError> {
        self.calls.lock().unwrap().push(spec.clone());

        let rendered = spec.to_string();
        let script = self
            .scripts
            .lock()
            .unwrap()
            .iter()
            .find(|s| rendered.contains(&s.pattern))
            .cloned();

        let Some(script) = script else {
            return Ok(RunOutcome::Exited(0));
        };
        if let Some(hook) = &script.hook {
            hook(spec);
        }

        match script.response {
            Response::Exit { lines, code } => {
                for line in &lines {
                    sink.report(line);
                }
                Ok(RunOutcome::Exited(code))
            }
            Response::LaunchFailure => Err(LauncherError::Launch {
                program: spec.program().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted launch failure"),
            }),
            Response::TimedOut => Ok(RunOutcome::TimedOut),
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: CommandSpec, sink: SharedSink) -> RunFuture<'_, i32> {
        Box::pin(async move {
            let outcome = self.answer(&spec, &sink)?;
            Ok(outcome.exit_code().unwrap_or(-1))
        })
    }

    fn run_bounded(
        &self,
        spec: CommandSpec,
        sink: SharedSink,
        _timeout: Option<Duration>,
    ) -> RunFuture<'_, RunOutcome> {
        Box::pin(async move { self.answer(&spec, &sink) })
    }
}
