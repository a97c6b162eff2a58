// src/probe.rs

//! Database connectivity check, treated as a black box by the workflows.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::config::DbSettings;
use crate::exec::RunFuture;

/// `TestConnection(host, port, user, password) -> bool`.
pub trait ConnectionProbe: Send + Sync {
    fn test_connection<'a>(&'a self, settings: &'a DbSettings) -> RunFuture<'a, bool>;
}

/// Checks that the database endpoint accepts TCP connections.
///
/// Credentials are not verified at this level; a listening server on the
/// configured host/port is reported as reachable.
#[derive(Debug, Clone)]
pub struct TcpConnectionProbe {
    timeout: Duration,
}

impl TcpConnectionProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpConnectionProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl ConnectionProbe for TcpConnectionProbe {
    fn test_connection<'a>(&'a self, settings: &'a DbSettings) -> RunFuture<'a, bool> {
        Box::pin(async move {
            let port = settings.port_number()?;
            let addr = (settings.host.trim(), port);

            match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
                Ok(Ok(_stream)) => {
                    info!(host = %settings.host, port, "database endpoint reachable");
                    Ok(true)
                }
                Ok(Err(e)) => {
                    debug!(host = %settings.host, port, error = %e, "database connect failed");
                    Ok(false)
                }
                Err(_) => {
                    debug!(host = %settings.host, port, "database connect timed out");
                    Ok(false)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LauncherError;

    fn settings(port: String) -> DbSettings {
        DbSettings {
            host: "127.0.0.1".into(),
            port,
            user: "root".into(),
            password: String::new(),
        }
    }

    #[tokio::test]
    async fn listening_endpoint_is_reachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let ok = TcpConnectionProbe::default()
            .test_connection(&settings(port.to_string()))
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let ok = TcpConnectionProbe::default()
            .test_connection(&settings(port.to_string()))
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn malformed_port_is_config_error() {
        let err = TcpConnectionProbe::default()
            .test_connection(&settings("not-a-port".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Config(_)));
    }
}
