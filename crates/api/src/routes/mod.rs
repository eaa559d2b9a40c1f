pub mod health;
pub mod workspace;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /workspaces                                         open workspace ids
/// /workspaces/{project_id}                            open + view, update, close
/// /workspaces/{project_id}/...                        workspace actions
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/workspaces", workspace::router())
}
