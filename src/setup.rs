// src/setup.rs

//! One-time environment setup pipeline.
//!
//! Steps run strictly in order and the first failure aborts the rest:
//!
//! 1. `git submodule update --init --recursive`
//! 2. `dotnet tool install --global dotnet-ef` (already installed is fine)
//! 3. `.env` validation: `MS2_DATA_FOLDER` must name an existing absolute
//!    directory
//! 4. concurrent download of the server data files into that directory
//! 5. `dotnet run` in the ingest project (after an optional database check)
//!
//! Every step is safe to repeat, so recovery is always "run it again from
//! the top".

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::EnvFile;
use crate::config::env_file::MS2_DATA_FOLDER;
use crate::errors::{LauncherError, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::fetch::{AssetFetcher, SERVER_ASSETS};
use crate::probe::ConnectionProbe;
use crate::sink::{MemorySink, SharedSink, TeeSink};

/// Project run by the ingest step, relative to the install root.
pub const INGEST_PROJECT: &str = "Maple2.File.Ingest";

/// Global tool installed by step 2.
pub const EF_TOOL: &str = "dotnet-ef";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Submodules = 1,
    ToolInstall = 2,
    ValidateEnv = 3,
    FetchAssets = 4,
    Ingest = 5,
}

impl SetupStep {
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SetupStep::Submodules => "submodule initialization",
            SetupStep::ToolInstall => "tool installation",
            SetupStep::ValidateEnv => "environment validation",
            SetupStep::FetchAssets => "asset download",
            SetupStep::Ingest => "data ingest",
        };
        f.write_str(label)
    }
}

pub struct SetupWorkflow {
    runner: Arc<dyn CommandRunner>,
    fetcher: Arc<dyn AssetFetcher>,
    probe: Option<Arc<dyn ConnectionProbe>>,
    install_root: PathBuf,
    assets: Vec<String>,
}

impl SetupWorkflow {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn AssetFetcher>,
        install_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            fetcher,
            probe: None,
            install_root: install_root.into(),
            assets: SERVER_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Check the database from `.env` before ingesting.
    pub fn with_probe(mut self, probe: Arc<dyn ConnectionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_assets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Run the whole pipeline, streaming everything into `sink`.
    pub async fn run(&self, sink: SharedSink) -> Result<()> {
        info!(install_root = %self.install_root.display(), "setup started");

        self.init_submodules(&sink).await?;
        complete(SetupStep::Submodules, &sink);

        self.install_tools(&sink).await?;
        complete(SetupStep::ToolInstall, &sink);

        let (env, data_dir) = self.validate_env(&sink)?;
        complete(SetupStep::ValidateEnv, &sink);

        sink.report(&format!(
            "→ Downloading server files into {}...",
            data_dir.display()
        ));
        self.fetcher
            .fetch_all(&data_dir, &self.assets, sink.clone())
            .await?;
        complete(SetupStep::FetchAssets, &sink);

        self.check_database(&env, &sink).await?;
        self.ingest(&sink).await?;
        complete(SetupStep::Ingest, &sink);

        sink.report("✔ Setup complete!");
        info!("setup finished");
        Ok(())
    }

    async fn init_submodules(&self, sink: &SharedSink) -> Result<()> {
        sink.report("→ Initializing Git submodules...");
        let spec = CommandSpec::new("git")
            .args(["submodule", "update", "--init", "--recursive"])
            .current_dir(&self.install_root);
        self.run_checked(spec, sink).await
    }

    async fn install_tools(&self, sink: &SharedSink) -> Result<()> {
        sink.report("→ Installing EF tool...");
        let spec = CommandSpec::new("dotnet")
            .args(["tool", "install", "--global", EF_TOOL])
            .current_dir(&self.install_root);
        let program = spec.to_string();

        let captured = MemorySink::new();
        let tee: SharedSink = Arc::new(TeeSink::new(sink.clone(), Arc::new(captured.clone())));
        let code = self.runner.run(spec, tee).await?;

        if code == 0 {
            return Ok(());
        }
        if captured
            .lines()
            .iter()
            .any(|l| l.to_ascii_lowercase().contains("already installed"))
        {
            sink.report(&format!("→ {EF_TOOL} already installed."));
            return Ok(());
        }
        Err(LauncherError::CommandFailed { program, code })
    }

    fn validate_env(&self, sink: &SharedSink) -> Result<(EnvFile, PathBuf)> {
        sink.report("→ Ensuring .env...");
        let env = EnvFile::ensure(&self.install_root)?;
        let value = env.get(MS2_DATA_FOLDER)?;
        let data_dir = validate_data_dir(value.as_deref())?;
        sink.report(&format!("→ Using Data folder: {}", data_dir.display()));
        Ok((env, data_dir))
    }

    async fn check_database(&self, env: &EnvFile, sink: &SharedSink) -> Result<()> {
        let Some(probe) = &self.probe else {
            return Ok(());
        };

        sink.report("→ Validating database connection...");
        let settings = env.db_settings()?;
        if probe.test_connection(&settings).await? {
            sink.report("✔ Database reachable.");
            Ok(())
        } else {
            sink.report("[ERROR] Database connection failed.");
            Err(LauncherError::Database(format!(
                "cannot connect to {}:{}",
                settings.host, settings.port
            )))
        }
    }

    async fn ingest(&self, sink: &SharedSink) -> Result<()> {
        sink.report(&format!("→ Running {INGEST_PROJECT}..."));
        let spec = CommandSpec::new("dotnet")
            .arg("run")
            .current_dir(self.install_root.join(INGEST_PROJECT));
        self.run_checked(spec, sink).await
    }

    /// Run and treat a non-zero exit as fatal.
    async fn run_checked(&self, spec: CommandSpec, sink: &SharedSink) -> Result<()> {
        let program = spec.to_string();
        let code = self.runner.run(spec, sink.clone()).await?;
        if code == 0 {
            Ok(())
        } else {
            Err(LauncherError::CommandFailed { program, code })
        }
    }
}

fn complete(step: SetupStep, sink: &SharedSink) {
    sink.report(&format!("step {} complete: {step}", step.number()));
}

/// `MS2_DATA_FOLDER` must be set, non-blank, absolute, and an existing
/// directory.
pub fn validate_data_dir(value: Option<&str>) -> Result<PathBuf> {
    let raw = value.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(LauncherError::Config(format!(
            "{MS2_DATA_FOLDER} missing in .env"
        )));
    }

    let path = PathBuf::from(raw);
    if !path.is_absolute() {
        return Err(LauncherError::Config(format!(
            "{MS2_DATA_FOLDER} is not an absolute path: {raw}"
        )));
    }
    if !path.is_dir() {
        return Err(LauncherError::Config(format!(
            "{MS2_DATA_FOLDER} is not an existing directory: {raw}"
        )));
    }
    Ok(path)
}
