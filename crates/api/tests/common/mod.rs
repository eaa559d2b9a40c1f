//! Shared helpers for API integration tests.
//!
//! The app is built with [`build_app_router`] over a [`WorkspaceManager`]
//! whose collaborators are an in-memory backend, so tests exercise the same
//! middleware stack production uses without a content backend.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use mosaico_api::config::ServerConfig;
use mosaico_api::router::build_app_router;
use mosaico_api::state::AppState;
use mosaico_core::generation::GenerationRequest;
use mosaico_core::project::{ImageRecord, Project, ProjectUpdate, SaveComponentsRequest};
use mosaico_core::types::DbId;
use mosaico_gateway::messages::{
    GenerationResponse, HandlebarRequest, HandlebarResponse, OptimizePromptRequest,
    OptimizePromptResponse, RefineRequest, RefineResponse, SaveComponentsResponse,
    TranslateRequest, TranslateResponse,
};
use mosaico_gateway::GatewayError;
use mosaico_pipeline::collaborators::{
    ContentGenerator, HandlebarExporter, MediaUploader, ProjectStore, TextAssistant, Translator,
};
use mosaico_pipeline::{Collaborators, Workflow, WorkspaceManager};

pub const PROJECT_ID: DbId = 7;

/// In-memory content backend. Generations are scripted; translations are
/// `"{lang}:{text}"` unless the language is marked failing.
#[derive(Default)]
pub struct FakeBackend {
    pub project: Mutex<Option<Project>>,
    pub generations: Mutex<VecDeque<GenerationResponse>>,
    pub failing_languages: Mutex<HashSet<String>>,
    pub saves: Mutex<Vec<SaveComponentsRequest>>,
    pub updates: Mutex<Vec<ProjectUpdate>>,
    pub uploads: Mutex<Vec<(String, usize)>>,
}

impl FakeBackend {
    pub fn push_variation(&self, pairs: &[(&str, &str)]) {
        let variation = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.generations.lock().unwrap().push_back(GenerationResponse {
            variations: vec![variation],
            original_text: String::new(),
            tone: String::new(),
            content_type: "newsletter".into(),
        });
    }
}

#[async_trait]
impl ContentGenerator for FakeBackend {
    async fn generate(&self, _: &GenerationRequest) -> Result<GenerationResponse, GatewayError> {
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(GatewayError::Api {
                operation: "generate content",
                status: 503,
                body: "no scripted response".into(),
            })
    }
}

#[async_trait]
impl Translator for FakeBackend {
    async fn translate(
        &self,
        request: &TranslateRequest,
    ) -> Result<TranslateResponse, GatewayError> {
        if self.failing_languages.lock().unwrap().contains(&request.target_language) {
            return Err(GatewayError::Api {
                operation: "translate content",
                status: 502,
                body: String::new(),
            });
        }
        Ok(TranslateResponse {
            translated_text: format!("{}:{}", request.target_language, request.text),
            original_text: request.text.clone(),
            source_language: "en".into(),
            target_language: request.target_language.clone(),
        })
    }
}

#[async_trait]
impl ProjectStore for FakeBackend {
    async fn get_project(&self, project_id: DbId) -> Result<Project, GatewayError> {
        self.project
            .lock()
            .unwrap()
            .clone()
            .filter(|p| p.id == project_id)
            .ok_or(GatewayError::Api {
                operation: "load project",
                status: 404,
                body: "Project not found".into(),
            })
    }

    async fn update_project(
        &self,
        project_id: DbId,
        update: &ProjectUpdate,
    ) -> Result<Project, GatewayError> {
        self.updates.lock().unwrap().push(update.clone());
        self.get_project(project_id).await
    }

    async fn save_components(
        &self,
        project_id: DbId,
        request: &SaveComponentsRequest,
    ) -> Result<SaveComponentsResponse, GatewayError> {
        self.saves.lock().unwrap().push(request.clone());
        Ok(SaveComponentsResponse {
            project_id,
            saved_count: request.components.len(),
        })
    }
}

#[async_trait]
impl HandlebarExporter for FakeBackend {
    async fn generate_handlebar(
        &self,
        request: &HandlebarRequest,
    ) -> Result<HandlebarResponse, GatewayError> {
        Ok(HandlebarResponse {
            component_key: request.component_key.clone(),
            handlebar_template: format!("{{{{{}}}}}", request.english_fallback),
        })
    }
}

#[async_trait]
impl MediaUploader for FakeBackend {
    async fn upload_image(
        &self,
        project_id: DbId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageRecord, GatewayError> {
        let id = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((filename.to_string(), bytes.len()));
            uploads.len() as DbId
        };
        Ok(ImageRecord {
            id,
            project_id,
            filename: filename.to_string(),
            gcs_path: format!("projects/{project_id}/{filename}"),
            gcs_public_url: Some(format!("https://cdn.test/{project_id}/{filename}")),
            uploaded_at: chrono::Utc::now(),
        })
    }
}

#[async_trait]
impl TextAssistant for FakeBackend {
    async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, GatewayError> {
        Ok(RefineResponse {
            refined_text: format!("{} (refined)", request.text),
            original_text: request.text.clone(),
            operation: request.operation.as_str().to_string(),
        })
    }

    async fn optimize_prompt(
        &self,
        request: &OptimizePromptRequest,
    ) -> Result<OptimizePromptResponse, GatewayError> {
        Ok(OptimizePromptResponse {
            optimized_prompt: format!("{} for {} readers", request.text, request.tone),
            improvements: vec!["Named the audience".into()],
        })
    }
}

/// A stored project with one "Hero" section holding `components`.
pub fn project(components: &[&str], records: Value, languages: &[&str]) -> Project {
    serde_json::from_value(json!({
        "id": PROJECT_ID,
        "name": "Spring launch",
        "brief_text": "Announce the spring collection",
        "structure": [{"key": "s1", "name": "Hero", "components": components}],
        "tone": "professional",
        "target_languages": languages,
        "labels": [],
        "status": "in_progress",
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z",
        "components": records,
        "images": []
    }))
    .unwrap()
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        backend_url: "http://backend.test".to_string(),
        backend_token: None,
        persist_debounce_ms: 20,
        translation_concurrency: 4,
        default_temperature: 0.7,
    }
}

/// Build the full application router over `backend`.
pub fn build_test_app(backend: &Arc<FakeBackend>) -> Router {
    let config = test_config();
    let collaborators = Collaborators {
        generator: backend.clone(),
        translator: backend.clone(),
        store: backend.clone(),
        exporter: backend.clone(),
        uploader: backend.clone(),
        assistant: backend.clone(),
    };
    let workflow = Arc::new(Workflow::new(collaborators, config.workflow_config()));
    let state = AppState {
        config: Arc::new(config.clone()),
        workspaces: WorkspaceManager::new(workflow),
    };
    build_app_router(state, &config)
}

/// A test app over a backend holding `project`.
pub fn app_with(project: Project) -> (Arc<FakeBackend>, Router) {
    let backend = Arc::new(FakeBackend::default());
    *backend.project.lock().unwrap() = Some(project);
    let app = build_test_app(&backend);
    (backend, app)
}

/// Upper bound for waiting on background saves.
pub const SAVE_WAIT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, json: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(json)).await
}

pub async fn put_json(app: &Router, uri: &str, json: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(json)).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Build a `multipart/form-data` body with a `file` part and optional
/// text parts.
pub fn multipart_body(filename: &str, bytes: &[u8], fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let boundary = "mosaico-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
