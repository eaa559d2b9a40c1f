use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mosaico_api::config::ServerConfig;
use mosaico_api::router::build_app_router;
use mosaico_api::state::AppState;
use mosaico_gateway::{MosaicoApi, NoToken, StaticToken, TokenProvider};
use mosaico_pipeline::{Collaborators, Workflow, WorkspaceManager};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mosaico_api=debug,mosaico_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    // --- Content backend ---
    let tokens: Arc<dyn TokenProvider> = match &config.backend_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => {
            tracing::warn!("MOSAICO_BACKEND_TOKEN not set, backend requests are unauthenticated");
            Arc::new(NoToken)
        }
    };
    let api = Arc::new(MosaicoApi::with_client(
        reqwest::Client::new(),
        config.backend_url.clone(),
        tokens,
    ));
    tracing::info!(backend_url = %api.api_url(), "Content backend configured");

    let workflow = Arc::new(Workflow::new(
        Collaborators::from_api(api),
        config.workflow_config(),
    ));
    let workspaces = WorkspaceManager::new(workflow);

    let state = AppState {
        config: Arc::new(config.clone()),
        workspaces: Arc::clone(&workspaces),
    };
    let app = build_app_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST:PORT");
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, flushing workspaces");
    workspaces.shutdown().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
