//! API Server
//!
//! Binds the REST router and serves it until shutdown.

use crate::error::{Error, Result};
use crate::service::ContentService;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::rest::RestRouter;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub listen_addr: SocketAddr,
    /// Per-request timeout in seconds; expiry cancels in-flight I/O
    pub request_timeout_secs: u64,
    /// Max request body size
    pub max_body_size: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            request_timeout_secs: 30,
            max_body_size: 64 * 1024,
        }
    }
}

impl ApiServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST API server
pub struct ApiServer {
    config: ApiServerConfig,
    service: Arc<ContentService>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, service: Arc<ContentService>) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &ApiServerConfig {
        &self.config
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let app = RestRouter::new(self.service.clone())
            .with_request_timeout(self.config.request_timeout())
            .with_max_body_size(self.config.max_body_size)
            .build();

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind REST server: {}", e)))?;

        info!("REST API listening on {}", self.config.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryContentStore;
    use crate::telemetry::ResolverMetrics;

    #[test]
    fn test_default_config() {
        let config = ApiServerConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let service = ContentService::new(
            Arc::new(MemoryContentStore::new()),
            None,
            ResolverMetrics::new().unwrap(),
        );
        let config = ApiServerConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = ApiServer::new(config, Arc::new(service));

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), server.run(shutdown))
            .await
            .unwrap()
            .unwrap();
    }
}
