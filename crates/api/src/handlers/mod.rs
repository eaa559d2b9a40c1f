//! Request handlers.
//!
//! Handlers resolve the project's workspace through the shared
//! [`WorkspaceManager`](mosaico_pipeline::WorkspaceManager), run one
//! workflow action and map failures via [`AppError`](crate::error::AppError).

pub mod workspace;
