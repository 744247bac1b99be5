//! Authenticated HTTP API over the Safer Streets data repository

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;


use std::sync::Arc;

use anyhow::{Context, Result};
use safer_streets_core::Repository;
use tokio::net::TcpListener;
use tracing::info;

pub use auth::{ApiCredential, CredentialError};
pub use error::{ApiError, UNAUTHORIZED_MESSAGE};
pub use safer_streets_core::API_KEY_HEADER;
pub use router::create_router;

/// Where the server listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// State shared by every request handler.
#[derive(Debug)]
pub struct ServerState {
    pub repository: Arc<Repository>,
    pub credential: ApiCredential,
}

impl ServerState {
    pub fn new(repository: Arc<Repository>, credential: ApiCredential) -> Self {
        Self {
            repository,
            credential,
        }
    }
}

pub struct ApiServer {
    config: ServerConfig,
    state: Arc<ServerState>,
}

impl ApiServer {
    pub fn new(repository: Arc<Repository>, credential: ApiCredential, config: ServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(ServerState::new(repository, credential)),
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        let stats = self.state.repository.current().stats();
        info!(
            "Safer Streets API listening on http://{} ({} forces, {} datasets)",
            local, stats.areas, stats.datasets
        );
        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
