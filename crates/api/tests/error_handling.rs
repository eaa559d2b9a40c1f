//! Tests for `AppError` to HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server is
//! needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;

use mosaico_api::error::AppError;
use mosaico_core::error::CoreError;
use mosaico_core::ComponentType;
use mosaico_gateway::GatewayError;
use mosaico_pipeline::WorkflowError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn validation_error_returns_400_envelope() {
    let err = AppError::from(CoreError::Validation("Brief must not be empty".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Brief must not be empty");
    assert_eq!(json["warnings"], serde_json::json!([]));
}

#[tokio::test]
async fn missing_record_returns_404() {
    let err = AppError::from(CoreError::NotFound {
        component_type: ComponentType::Body,
        index: 3,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn no_variation_returns_422() {
    let err = AppError::from(CoreError::NoVariation {
        component_type: ComponentType::Title,
        index: 1,
        attempts: 3,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "NO_VARIATION");
}

#[tokio::test]
async fn conflict_and_stale_return_409() {
    let (status, json) =
        error_to_response(AppError::from(CoreError::Conflict("Slot is not being edited".into())))
            .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Slot is not being edited");

    let (status, json) = error_to_response(AppError::Workflow(WorkflowError::Stale(7))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn missing_project_in_store_returns_404() {
    let err = AppError::Workflow(WorkflowError::Collaborator(GatewayError::Api {
        operation: "load project",
        status: 404,
        body: "Project not found".into(),
    }));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn collaborator_failures_return_502() {
    let err = AppError::Workflow(WorkflowError::Collaborator(GatewayError::Api {
        operation: "generate content",
        status: 503,
        body: String::new(),
    }));
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "COLLABORATOR_ERROR");

    let err = AppError::Workflow(WorkflowError::InvalidResponse("empty refine".into()));
    let (status, _) = error_to_response(err).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn workspace_not_open_returns_404() {
    let (status, json) = error_to_response(AppError::WorkspaceNotOpen(9)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "No open workspace for project 9");
}
