pub mod comments;
pub mod history;
pub mod locations;
pub mod mock;
pub mod routes;
pub mod types;
pub mod youtube;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::config::Config;
use crate::error::ServerError;
use comments::InMemoryCommentStore;
use history::{InMemorySessionStore, Sessions};
use routes::{build_router, ApiState};
use youtube::YouTubeService;

pub struct AppState {
    pub config: Config,
    pub api_state: ApiState,
}

impl AppState {
    /// Wires the upstream client and the in-memory stores from `config`.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let youtube = Arc::new(YouTubeService::new(&config).map_err(ServerError::Client)?);
        let sessions = Sessions::new(
            Arc::new(InMemorySessionStore::new()),
            config.default_region.clone(),
            config.search_history_limit,
            config.watch_history_limit,
        );

        info!(
            fallback = %youtube.fallback(),
            credential = youtube.has_credential(),
            "Upstream client ready"
        );

        let api_state = ApiState {
            youtube,
            sessions,
            comments: Arc::new(InMemoryCommentStore::new()),
        };

        Ok(Self { config, api_state })
    }

    pub fn router(&self) -> Router {
        build_router(self.api_state.clone(), self.config.static_dir.clone())
    }
}

pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let router = state.router();
    let addr = state.config.bind_address();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
