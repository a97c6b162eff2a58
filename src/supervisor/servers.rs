// src/supervisor/servers.rs

//! What to launch: generic `LaunchSpec`s and the fixed server fleet.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::exec::CommandSpec;

/// Target framework directory of `dotnet build` output.
pub const BUILD_FRAMEWORK: &str = "net8.0";

/// Optional build step followed by direct execution of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    build: Option<CommandSpec>,
    executable: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            build: None,
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Build with `dotnet build <project>` from `install_root`, then run
    /// `<install_root>/<project>/bin/Debug/net8.0/<project>` from its own
    /// directory.
    pub fn for_server(kind: ServerKind, install_root: &Path) -> Self {
        let project = kind.project();
        let exe_dir = install_root
            .join(project)
            .join("bin")
            .join("Debug")
            .join(BUILD_FRAMEWORK);
        let executable = exe_dir.join(format!("{project}{}", std::env::consts::EXE_SUFFIX));

        Self::new(executable)
            .with_build(
                CommandSpec::new("dotnet")
                    .args(["build", project])
                    .current_dir(install_root),
            )
            .current_dir(exe_dir)
    }

    pub fn with_build(mut self, build: CommandSpec) -> Self {
        self.build = Some(build);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn build(&self) -> Option<&CommandSpec> {
        self.build.as_ref()
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Explicit working directory, else the executable's directory.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir
            .as_deref()
            .or_else(|| self.executable.parent().filter(|p| !p.as_os_str().is_empty()))
    }
}

/// The four servers that make up a local deployment, in launch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerKind {
    World,
    Login,
    Web,
    Game,
}

impl ServerKind {
    pub const ALL: [ServerKind; 4] = [
        ServerKind::World,
        ServerKind::Login,
        ServerKind::Web,
        ServerKind::Game,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ServerKind::World => "World",
            ServerKind::Login => "Login",
            ServerKind::Web => "Web",
            ServerKind::Game => "Game",
        }
    }

    pub fn project(self) -> &'static str {
        match self {
            ServerKind::World => "Maple2.Server.World",
            ServerKind::Login => "Maple2.Server.Login",
            ServerKind::Web => "Maple2.Server.Web",
            ServerKind::Game => "Maple2.Server.Game",
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServerKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown server: {s} (expected one of World, Login, Web, Game)")
            })
    }
}
