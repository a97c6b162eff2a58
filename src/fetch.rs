// src/fetch.rs

//! Concurrent download of a fixed set of named assets.

use std::path::{Path, PathBuf};

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::errors::{Cause, LauncherError, Result};
use crate::exec::RunFuture;
use crate::sink::SharedSink;

/// Release download location of the server data files.
pub const ASSET_BASE_URL: &str = "https://github.com/Zintixx/MapleStory2-XML/releases/latest/download";

/// Files required by the ingest step.
pub const SERVER_ASSETS: [&str; 4] = ["Server.m2d", "Server.m2h", "Xml.m2d", "Xml.m2h"];

/// Trait abstracting how assets are retrieved, so workflows can be tested
/// without network access.
pub trait AssetFetcher: Send + Sync {
    /// Retrieve every name into `dest`, all at once.
    ///
    /// Completes when every retrieval has finished. The first failure is
    /// returned, but siblings are never cancelled, so a partial set of files
    /// may remain on disk.
    fn fetch_all<'a>(
        &'a self,
        dest: &'a Path,
        names: &'a [String],
        sink: SharedSink,
    ) -> RunFuture<'a, ()>;
}

/// HTTP fetcher: `GET <base_url>/<name>` for each name.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetcher pointed at the public release assets.
    pub fn releases() -> Self {
        Self::new(Client::new(), ASSET_BASE_URL)
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    async fn fetch_one(&self, dest: &Path, name: &str) -> std::result::Result<PathBuf, Cause> {
        let url = self.url_for(name);
        debug!(%url, "fetching asset");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let target = dest.join(name);
        tokio::fs::write(&target, &body).await?;
        Ok(target)
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch_all<'a>(
        &'a self,
        dest: &'a Path,
        names: &'a [String],
        sink: SharedSink,
    ) -> RunFuture<'a, ()> {
        Box::pin(async move {
            tokio::fs::create_dir_all(dest).await?;
            info!(dest = %dest.display(), count = names.len(), "fetching assets");

            let mut in_flight: FuturesUnordered<_> = names
                .iter()
                .map(move |name| async move { (name, self.fetch_one(dest, name).await) })
                .collect();

            let mut first_error: Option<LauncherError> = None;
            while let Some((name, result)) = in_flight.next().await {
                match result {
                    Ok(path) => sink.report(&format!("→ {name} saved to {}", path.display())),
                    Err(source) => {
                        warn!(%name, error = %source, "asset download failed");
                        sink.report(&format!("[ERR] {name}: {source}"));
                        if first_error.is_none() {
                            first_error = Some(LauncherError::Fetch {
                                name: name.clone(),
                                source,
                            });
                        }
                    }
                }
            }

            match first_error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }
}
