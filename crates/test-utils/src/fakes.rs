use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use maple2_launcher::config::DbSettings;
use maple2_launcher::errors::LauncherError;
use maple2_launcher::exec::RunFuture;
use maple2_launcher::fetch::AssetFetcher;
use maple2_launcher::probe::ConnectionProbe;
use maple2_launcher::sink::SharedSink;

/// Writes `fake:<name>` for every requested asset instead of downloading.
///
/// With [`failing_on`](Self::failing_on), that one name is skipped and the
/// batch reports a `Fetch` error after the others are written.
#[derive(Default, Clone)]
pub struct FakeFetcher {
    calls: Arc<AtomicUsize>,
    fail_name: Option<String>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Number of `fetch_all` batches requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssetFetcher for FakeFetcher {
    fn fetch_all<'a>(
        &'a self,
        dest: &'a Path,
        names: &'a [String],
        sink: SharedSink,
    ) -> RunFuture<'a, ()> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(dest)?;

            let mut failure = None;
            for name in names {
                if self.fail_name.as_deref() == Some(name.as_str()) {
                    sink.report(&format!("[ERR] {name}: scripted failure"));
                    failure.get_or_insert_with(|| name.clone());
                    continue;
                }
                std::fs::write(dest.join(name), format!("fake:{name}"))?;
                sink.report(&format!("→ {name} saved"));
            }

            match failure {
                Some(name) => Err(LauncherError::Fetch {
                    name,
                    source: "scripted failure".into(),
                }),
                None => Ok(()),
            }
        })
    }
}

/// Answers every connection test with a fixed result.
#[derive(Clone)]
pub struct FakeProbe {
    reachable: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            calls: Arc::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConnectionProbe for FakeProbe {
    fn test_connection<'a>(&'a self, _settings: &'a DbSettings) -> RunFuture<'a, bool> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reachable)
        })
    }
}
