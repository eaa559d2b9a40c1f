use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use mosaico_core::error::CoreError;
use mosaico_gateway::GatewayError;
use mosaico_pipeline::WorkflowError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`WorkflowError`] for action failures and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce the failure envelope
/// `{"success": false, "error", "code", "warnings"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The workspace is not open.
    #[error("No open workspace for project {0}")]
    WorkspaceNotOpen(mosaico_core::types::DbId),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Workflow(WorkflowError::Core(err))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Workflow(WorkflowError::Core(core)) => classify_core_error(core),
            AppError::Workflow(WorkflowError::Collaborator(err)) => classify_gateway_error(err),
            AppError::Workflow(WorkflowError::InvalidResponse(msg)) => {
                tracing::warn!(error = %msg, "Collaborator returned unusable content");
                (StatusCode::BAD_GATEWAY, "COLLABORATOR_ERROR", msg.clone())
            }
            AppError::Workflow(err @ WorkflowError::Stale(_)) => {
                (StatusCode::CONFLICT, "CONFLICT", err.to_string())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::WorkspaceNotOpen(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
            "warnings": [],
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        CoreError::NoVariation { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "NO_VARIATION",
            err.to_string(),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
    }
}

/// A missing project in the store is a 404; every other collaborator
/// failure is a 502 carrying the collaborator's message.
fn classify_gateway_error(err: &GatewayError) -> (StatusCode, &'static str, String) {
    if err.status() == Some(404) {
        return (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string());
    }
    tracing::warn!(error = %err, "Collaborator call failed");
    (StatusCode::BAD_GATEWAY, "COLLABORATOR_ERROR", err.to_string())
}
