// src/cli.rs

//! CLI argument parsing using `clap` (derive).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `maple2-launcher`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "maple2-launcher",
    version,
    about = "Clone, set up and run a local Maple2 server deployment.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the launcher config file (JSON).
    ///
    /// Default: `launcher.config.json` in the current working directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MAPLE2_LAUNCHER_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show or change the saved repository URL and install root.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check that a git remote answers within a deadline.
    Probe {
        /// Remote to probe; defaults to the configured repository.
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Deadline in seconds.
        #[arg(long, value_name = "SECS", default_value_t = 15)]
        timeout: u64,
    },

    /// Clone or pull the server repository into the install root.
    Sync(SyncArgs),

    /// List submodules of the install root and their state.
    Submodules,

    /// Run the one-time environment setup.
    Setup {
        /// Skip the database check before ingesting.
        #[arg(long)]
        skip_db_check: bool,
    },

    /// Test database credentials and store them in `.env`.
    Db(DbArgs),

    /// Build and launch every server, then accept console commands.
    Run,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,

    /// Update and save the configuration.
    Set {
        #[arg(long, value_name = "URL")]
        repo: Option<String>,

        #[arg(long, value_name = "DIR")]
        install_root: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Override the configured repository URL.
    #[arg(long, value_name = "URL")]
    pub repo: Option<String>,

    /// Override the configured install root.
    #[arg(long, value_name = "DIR")]
    pub install_root: Option<PathBuf>,

    /// Do not probe the remote before cloning or pulling.
    #[arg(long)]
    pub no_probe: bool,

    /// Persist the overrides after a successful sync.
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DbArgs {
    #[arg(long, default_value = "localhost")]
    pub host: String,

    #[arg(long, default_value_t = 3306)]
    pub port: u16,

    #[arg(long, default_value = "root")]
    pub user: String,

    #[arg(long, default_value = "")]
    pub password: String,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_work_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "maple2-launcher",
            "sync",
            "--no-probe",
            "--log-level",
            "debug",
            "--config",
            "alt.json",
        ])
        .unwrap();

        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert_eq!(args.config, Some(PathBuf::from("alt.json")));
        match args.command {
            Command::Sync(sync) => {
                assert!(sync.no_probe);
                assert!(!sync.save);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn db_defaults_match_local_mysql() {
        let args = CliArgs::try_parse_from(["maple2-launcher", "db"]).unwrap();
        let Command::Db(db) = args.command else {
            panic!("expected db command");
        };
        assert_eq!(db.host, "localhost");
        assert_eq!(db.port, 3306);
        assert_eq!(db.user, "root");
    }

    #[test]
    fn subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["maple2-launcher"]).is_err());
    }
}
