// tests/asset_fetch.rs

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::Path as UrlPath;
use axum::http::StatusCode;
use axum::routing::get;
use launcher_test_utils::{init_tracing, with_timeout};
use maple2_launcher::errors::LauncherError;
use maple2_launcher::fetch::{AssetFetcher, HttpFetcher, SERVER_ASSETS};
use maple2_launcher::sink::MemorySink;

type TestResult = Result<(), Box<dyn Error>>;

/// Serves `payload:<name>` for every name except `Missing.bin`.
async fn serve_assets() -> Result<SocketAddr, Box<dyn Error>> {
    async fn asset(UrlPath(name): UrlPath<String>) -> Result<String, StatusCode> {
        if name == "Missing.bin" {
            Err(StatusCode::NOT_FOUND)
        } else {
            Ok(format!("payload:{name}"))
        }
    }

    let app = Router::new().route("/download/{name}", get(asset));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

fn fetcher_for(addr: SocketAddr) -> HttpFetcher {
    HttpFetcher::new(reqwest::Client::new(), format!("http://{addr}/download/"))
}

#[tokio::test]
async fn downloads_every_asset_into_a_fresh_directory() -> TestResult {
    with_timeout(async {
        init_tracing();
        let addr = serve_assets().await?;
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("not").join("yet").join("there");
        let names: Vec<String> = SERVER_ASSETS.iter().map(|s| s.to_string()).collect();
        let out = MemorySink::new();

        fetcher_for(addr)
            .fetch_all(&dest, &names, Arc::new(out.clone()))
            .await?;

        for name in &names {
            let body = std::fs::read_to_string(dest.join(name))?;
            assert_eq!(body, format!("payload:{name}"));
            assert!(out.contains(name));
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn refetching_overwrites_existing_files() -> TestResult {
    with_timeout(async {
        let addr = serve_assets().await?;
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("Server.m2d"), "stale")?;
        let names: Vec<String> = SERVER_ASSETS.iter().map(|s| s.to_string()).collect();
        let fetcher = fetcher_for(addr);

        for _ in 0..2 {
            fetcher
                .fetch_all(dir.path(), &names, Arc::new(MemorySink::new()))
                .await?;
        }

        assert_eq!(std::fs::read_to_string(dir.path().join("Server.m2d"))?, "payload:Server.m2d");
        for name in &names {
            assert_eq!(std::fs::read_to_string(dir.path().join(name))?, format!("payload:{name}"));
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn one_missing_asset_fails_the_batch_but_keeps_the_rest() -> TestResult {
    with_timeout(async {
        let addr = serve_assets().await?;
        let dir = tempfile::tempdir()?;
        let names: Vec<String> = ["A.bin", "Missing.bin", "C.bin"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = MemorySink::new();

        let err = fetcher_for(addr)
            .fetch_all(dir.path(), &names, Arc::new(out.clone()))
            .await
            .expect_err("404 must fail the batch");

        match err {
            LauncherError::Fetch { name, .. } => assert_eq!(name, "Missing.bin"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(dir.path().join("A.bin").is_file());
        assert!(dir.path().join("C.bin").is_file());
        assert!(!dir.path().join("Missing.bin").exists());
        assert!(out.contains("[ERR] Missing.bin"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn empty_batch_only_creates_the_directory() -> TestResult {
    with_timeout(async {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("Data");
        let fetcher = HttpFetcher::new(reqwest::Client::new(), "http://127.0.0.1:9");

        fetcher
            .fetch_all(&dest, &[], Arc::new(MemorySink::new()))
            .await?;

        assert!(dest.is_dir());
        Ok(())
    })
    .await
}

#[test]
fn urls_join_base_and_name_with_one_slash() {
    let fetcher = HttpFetcher::new(reqwest::Client::new(), "http://host/releases/");
    assert_eq!(fetcher.url_for("Xml.m2d"), "http://host/releases/Xml.m2d");
}
