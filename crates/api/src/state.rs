use std::sync::Arc;

use mosaico_pipeline::WorkspaceManager;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Open project workspaces and the workflow that acts on them.
    pub workspaces: Arc<WorkspaceManager>,
}
