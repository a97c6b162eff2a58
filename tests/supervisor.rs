// tests/supervisor.rs
#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use launcher_test_utils::builders::{echo_server, idle_server, write_script};
use launcher_test_utils::{FakeRunner, init_tracing, with_timeout};
use maple2_launcher::errors::LauncherError;
use maple2_launcher::exec::CommandSpec;
use maple2_launcher::sink::{MemorySink, SharedSink};
use maple2_launcher::supervisor::servers::BUILD_FRAMEWORK;
use maple2_launcher::supervisor::{LaunchSpec, ProcessSupervisor, ServerKind};

type TestResult = Result<(), Box<dyn Error>>;

fn supervisor(runner: FakeRunner) -> ProcessSupervisor {
    ProcessSupervisor::new(Arc::new(runner))
}

/// Poll `sink` until some line contains `needle`.
async fn wait_for_line(sink: &MemorySink, needle: &str) {
    while !sink.contains(needle) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn launched_process_receives_stdin_and_streams_output() -> TestResult {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let exe = echo_server(dir.path(), "echo.sh");
        let sup = supervisor(FakeRunner::new());
        let out = MemorySink::new();

        let process = sup
            .launch("Echo", LaunchSpec::new(&exe), Arc::new(out.clone()))
            .await?;
        assert!(process.is_running());
        assert!(out.contains(&format!("✔ Echo started (PID {})", process.pid())));

        wait_for_line(&out, "ready").await;
        sup.send("Echo", "hello world").await?;
        wait_for_line(&out, "got: hello world").await;

        sup.kill_all().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn stderr_lines_are_prefixed() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let exe = write_script(dir.path(), "noisy.sh", "echo 'bad things' 1>&2\nexec sleep 300");
        let sup = supervisor(FakeRunner::new());
        let out = MemorySink::new();

        sup.launch("Noisy", LaunchSpec::new(&exe), Arc::new(out.clone()))
            .await?;
        wait_for_line(&out, "[ERR] bad things").await;

        sup.kill_all().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn inspect_reports_growing_uptime() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let exe = idle_server(dir.path(), "idle.sh");
        let sup = supervisor(FakeRunner::new());

        let process = sup
            .launch("Idle", LaunchSpec::new(&exe), Arc::new(MemorySink::new()))
            .await?;

        let first = sup.inspect("Idle").await?;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let second = sup.inspect("Idle").await?;

        assert_eq!(first.pid, process.pid());
        assert_eq!(first.name, "Idle");
        assert!(second.uptime > first.uptime);
        assert!(second.uptime >= Duration::from_millis(150));

        sup.kill_all().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn kill_reports_snapshot_then_exit_and_later_calls_see_not_running() -> TestResult {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let exe = idle_server(dir.path(), "idle.sh");
        let sup = supervisor(FakeRunner::new());
        let out = MemorySink::new();
        let sink: SharedSink = Arc::new(out.clone());

        let process = sup.launch("Login", LaunchSpec::new(&exe), sink.clone()).await?;
        wait_for_line(&out, "started").await;

        sup.kill("Login", sink.clone()).await?;
        let code = sup.wait("Login").await?;
        assert_ne!(code, 0);
        assert!(!process.is_running());

        assert!(out.contains(&format!("WRN] Login: Killing process {}", process.pid())));
        assert!(out.contains("INF] Login: Uptime"));
        wait_for_line(&out, "INF] Login: Exited code").await;

        assert!(matches!(sup.inspect("Login").await, Err(LauncherError::NotRunning(_))));
        assert!(matches!(sup.send("Login", "x").await, Err(LauncherError::NotRunning(_))));
        // Killing an exited process is a no-op, and the entry stays tracked.
        sup.kill("Login", sink).await?;
        assert_eq!(sup.names().await, vec!["Login".to_string()]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn natural_exit_is_observed() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let exe = write_script(dir.path(), "quick.sh", "echo bye\nexit 4");
        let sup = supervisor(FakeRunner::new());
        let out = MemorySink::new();

        sup.launch("Quick", LaunchSpec::new(&exe), Arc::new(out.clone()))
            .await?;

        assert_eq!(sup.wait("Quick").await?, 4);
        assert!(out.contains("bye"));
        assert!(out.contains("Exited code 4 at"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unknown_names_are_not_found() -> TestResult {
    with_timeout(async {
        let sup = supervisor(FakeRunner::new());
        let sink: SharedSink = Arc::new(MemorySink::new());

        assert!(matches!(sup.send("Ghost", "hi").await, Err(LauncherError::NotFound(_))));
        assert!(matches!(sup.inspect("Ghost").await, Err(LauncherError::NotFound(_))));
        assert!(matches!(sup.kill("Ghost", sink).await, Err(LauncherError::NotFound(_))));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn kill_all_with_nothing_tracked_returns_immediately() -> TestResult {
    with_timeout(async {
        let sup = supervisor(FakeRunner::new());
        tokio::time::timeout(Duration::from_millis(200), sup.kill_all()).await?;
        assert!(sup.names().await.is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn kill_all_terminates_every_running_process() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let exe = idle_server(dir.path(), "idle.sh");
        let sup = supervisor(FakeRunner::new());

        let mut handles = Vec::new();
        for name in ["A", "B", "C"] {
            handles.push(
                sup.launch(name, LaunchSpec::new(&exe), Arc::new(MemorySink::new()))
                    .await?,
            );
        }

        sup.kill_all().await;

        for handle in &handles {
            assert!(!handle.is_running(), "{} still running", handle.name());
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn missing_executable_is_reported_and_not_registered() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let sup = supervisor(FakeRunner::new());
        let out = MemorySink::new();

        let err = sup
            .launch(
                "World",
                LaunchSpec::new(dir.path().join("nope")),
                Arc::new(out.clone()),
            )
            .await
            .expect_err("missing artifact");

        assert!(matches!(err, LauncherError::ExecutableNotFound(_)), "{err}");
        assert!(out.contains("[ERR] Could not find"));
        assert!(!sup.contains("World").await);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failed_build_never_starts_the_artifact() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("ran");
        let exe = write_script(dir.path(), "server.sh", &format!("touch {}", marker.display()));
        let runner = FakeRunner::new().on_with_output("dotnet build", &["error CS1002"], 1);
        let sup = supervisor(runner.clone());
        let out = MemorySink::new();

        let spec = LaunchSpec::new(&exe).with_build(CommandSpec::new("dotnet").args(["build", "Server"]));
        let err = sup
            .launch("Game", spec, Arc::new(out.clone()))
            .await
            .expect_err("build failure");

        assert!(matches!(err, LauncherError::Build { ref name, .. } if name == "Game"), "{err}");
        assert!(out.contains("error CS1002"));
        assert!(!sup.contains("Game").await);
        assert_eq!(runner.calls_matching("dotnet build").len(), 1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!marker.exists());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn relaunch_replaces_and_kills_previous_instance() -> TestResult {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let exe = idle_server(dir.path(), "idle.sh");
        let sup = supervisor(FakeRunner::new());

        let first = sup
            .launch("Web", LaunchSpec::new(&exe), Arc::new(MemorySink::new()))
            .await?;
        let second = sup
            .launch("Web", LaunchSpec::new(&exe), Arc::new(MemorySink::new()))
            .await?;

        assert!(!first.is_running(), "old instance must be gone");
        assert!(second.is_running());
        assert_ne!(first.pid(), second.pid());
        assert_eq!(sup.get("Web").await?.pid(), second.pid());
        assert_eq!(sup.names().await.len(), 1);

        sup.clear().await;
        assert!(sup.names().await.is_empty());
        assert!(!second.is_running());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn fleet_builds_and_launches_every_server_in_order() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        for kind in ServerKind::ALL {
            let exe_dir = root
                .path()
                .join(kind.project())
                .join("bin")
                .join("Debug")
                .join(BUILD_FRAMEWORK);
            std::fs::create_dir_all(&exe_dir)?;
            write_script(&exe_dir, kind.project(), "exec sleep 300");
        }
        let runner = FakeRunner::new();
        let sup = supervisor(runner.clone());

        let results = sup
            .launch_fleet(root.path(), |_| Arc::new(MemorySink::new()) as SharedSink)
            .await;

        let order: Vec<ServerKind> = results.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(order, ServerKind::ALL.to_vec());
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(
            runner.calls_matching("dotnet build"),
            vec![
                "dotnet build Maple2.Server.World",
                "dotnet build Maple2.Server.Login",
                "dotnet build Maple2.Server.Web",
                "dotnet build Maple2.Server.Game",
            ]
        );
        assert_eq!(sup.names().await, vec!["Game", "Login", "Web", "World"]);

        sup.kill_all().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn fleet_keeps_going_when_one_server_is_missing() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let kind = ServerKind::Login;
        let exe_dir = root
            .path()
            .join(kind.project())
            .join("bin/Debug")
            .join(BUILD_FRAMEWORK);
        std::fs::create_dir_all(&exe_dir)?;
        write_script(&exe_dir, kind.project(), "exec sleep 300");
        let sup = supervisor(FakeRunner::new());

        let results = sup
            .launch_fleet(root.path(), |_| Arc::new(MemorySink::new()) as SharedSink)
            .await;

        let started: Vec<ServerKind> = results
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(kind, _)| *kind)
            .collect();
        assert_eq!(started, vec![ServerKind::Login]);
        assert!(
            results
                .iter()
                .filter(|(_, r)| r.is_err())
                .all(|(_, r)| matches!(r, Err(LauncherError::ExecutableNotFound(_))))
        );

        sup.kill_all().await;
        Ok(())
    })
    .await
}
