mod error;
pub mod live;
mod routes;
pub mod session;
pub mod shutdown;
mod ws;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{extract::FromRef, routing::get, Router};
use ezviewer_core::{Config, Registry};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub config: Arc<Config>,
    /// Flips to `true` when the server is shutting down; live tails watch it.
    pub shutdown: watch::Receiver<bool>,
}

impl FromRef<AppState> for Registry {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Build the full router: web shell, JSON API and the streaming socket.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/logs", get(routes::logs::list_logs))
        .route("/history", get(routes::logs::history));

    Router::new()
        .route("/", get(routes::index::index))
        .route("/ws/{alias}", get(ws::stream_ws))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind `config.server.host:port` and serve until `shutdown` resolves.
///
/// Open streaming sessions are told to stop through the state's shutdown
/// channel so graceful shutdown does not wait on idle viewers.
pub async fn serve(
    config: Config,
    registry: Registry,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        registry,
        config: Arc::new(config),
        shutdown: shutdown_rx,
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("ezviewer listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("Server error")?;

    tracing::info!("ezviewer stopped");
    Ok(())
}
