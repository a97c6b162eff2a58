// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod exec;
pub mod fetch;
pub mod logging;
pub mod probe;
pub mod repo;
pub mod setup;
pub mod sink;
pub mod supervisor;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command, ConfigAction, DbArgs, SyncArgs};
use crate::config::{ConfigStore, DbSettings, EnvFile, LauncherConfig};
use crate::exec::{CommandRunner, ProcessRunner};
use crate::fetch::HttpFetcher;
use crate::probe::{ConnectionProbe, TcpConnectionProbe};
use crate::repo::RepoSync;
use crate::setup::SetupWorkflow;
use crate::sink::{ConsoleSink, SharedSink};
use crate::supervisor::ProcessSupervisor;

/// High-level entry point used by `main.rs`.
///
/// Loads the launcher config, builds the production collaborators
/// (process runner, HTTP fetcher, TCP probe) and dispatches the
/// subcommand.
pub async fn run(args: CliArgs) -> Result<()> {
    let store = match &args.config {
        Some(path) => ConfigStore::at_path(path),
        None => ConfigStore::new(std::env::current_dir().context("no working directory")?),
    };
    let config = store
        .load_or_default()
        .with_context(|| format!("loading {}", store.path().display()))?;

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let out: SharedSink = Arc::new(ConsoleSink::new());

    match args.command {
        Command::Config { action } => run_config(&store, config, action),
        Command::Probe { url, timeout } => {
            let url = url.unwrap_or(config.repo_root);
            let repo = RepoSync::new(runner);
            if repo
                .can_reach_remote(&url, Some(Duration::from_secs(timeout)))
                .await
            {
                println!("✔ {url} is reachable.");
                Ok(())
            } else {
                bail!("{url} did not answer within {timeout}s")
            }
        }
        Command::Sync(sync) => run_sync(&store, config, sync, runner, out).await,
        Command::Submodules => {
            let statuses = RepoSync::new(runner)
                .submodule_status(&config.install_root)
                .await?;
            if statuses.is_empty() {
                println!("no submodules in {}", config.install_root.display());
            }
            for status in statuses {
                println!("{:?}\t{}\t{}", status.state, status.commit, status.path);
            }
            Ok(())
        }
        Command::Setup { skip_db_check } => {
            let mut workflow = SetupWorkflow::new(
                runner,
                Arc::new(HttpFetcher::releases()),
                &config.install_root,
            );
            if !skip_db_check {
                workflow = workflow.with_probe(Arc::new(TcpConnectionProbe::default()));
            }
            workflow.run(out).await?;
            Ok(())
        }
        Command::Db(db) => run_db(&config.install_root, db).await,
        Command::Run => run_fleet(&config.install_root, runner).await,
    }
}

fn run_config(store: &ConfigStore, mut config: LauncherConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", store.path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set { repo, install_root } => {
            if let Some(repo) = repo {
                config.repo_root = repo;
            }
            if let Some(root) = install_root {
                config.install_root = absolute(root)?;
            }
            store.save(&config)?;
            println!("✔ Saved {}", store.path().display());
        }
    }
    Ok(())
}

async fn run_sync(
    store: &ConfigStore,
    mut config: LauncherConfig,
    args: SyncArgs,
    runner: Arc<dyn CommandRunner>,
    sink: SharedSink,
) -> Result<()> {
    if let Some(repo) = args.repo {
        config.repo_root = repo;
    }
    if let Some(root) = args.install_root {
        config.install_root = absolute(root)?;
    }

    let repo = RepoSync::new(runner);
    if !args.no_probe {
        sink.report(&format!("→ Checking {}...", config.repo_root));
        repo.ensure_reachable(&config.repo_root, None).await?;
    }

    let action = repo
        .sync(&config.repo_root, &config.install_root, sink)
        .await?;
    info!(?action, "sync finished");

    if args.save {
        store.save(&config)?;
    }
    Ok(())
}

async fn run_db(install_root: &Path, args: DbArgs) -> Result<()> {
    let settings = DbSettings {
        host: args.host,
        port: args.port.to_string(),
        user: args.user,
        password: args.password,
    };

    let probe = TcpConnectionProbe::default();
    if !probe.test_connection(&settings).await? {
        bail!(
            "could not connect to database at {}:{}",
            settings.host,
            settings.port
        );
    }

    let env = EnvFile::ensure(install_root)?;
    env.save_db_settings(&settings)?;
    println!("✔ Database settings saved to {}", env.path().display());
    Ok(())
}

/// Launch the fleet, then hand stdin to the console until `:quit`, end of
/// input or Ctrl-C. Every supervised process is killed on the way out.
async fn run_fleet(install_root: &Path, runner: Arc<dyn CommandRunner>) -> Result<()> {
    let supervisor = ProcessSupervisor::new(runner);
    supervisor.clear().await;

    let results = supervisor
        .launch_fleet(install_root, |kind| {
            Arc::new(ConsoleSink::prefixed(kind.name())) as SharedSink
        })
        .await;
    let started = results.iter().filter(|(_, r)| r.is_ok()).count();
    if started == 0 {
        bail!("no server could be started");
    }
    info!(started, total = results.len(), "fleet launched");

    let out: SharedSink = Arc::new(ConsoleSink::prefixed("console"));
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        res = console::run_console(&supervisor, stdin, out) => {
            if let Err(e) = res {
                warn!(error = %e, "console input failed");
            }
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
            info!("Ctrl+C received; shutting down");
        }
    }

    supervisor.kill_all().await;
    Ok(())
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
