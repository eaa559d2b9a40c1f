//! In-memory collaborators for workflow tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use mosaico_core::generation::{GenerationRequest, Variation};
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
use mosaico_pipeline::persistence::PersistenceConfig;
use mosaico_pipeline::{Collaborators, ProjectWorkspace, Workflow, WorkflowConfig};

pub const PROJECT_ID: DbId = 7;

/// One backend double implementing every collaborator.
///
/// Generation answers are scripted in order; translations are derived from
/// the input as `"{lang}:{text}"` unless the language is marked failing.
#[derive(Default)]
pub struct FakeBackend {
    pub project: Mutex<Option<Project>>,
    pub generations: Mutex<VecDeque<Result<GenerationResponse, GatewayError>>>,
    pub generate_requests: Mutex<Vec<GenerationRequest>>,
    pub translate_requests: Mutex<Vec<TranslateRequest>>,
    pub failing_languages: Mutex<HashSet<String>>,
    pub saves: Mutex<Vec<SaveComponentsRequest>>,
    pub updates: Mutex<Vec<ProjectUpdate>>,
    pub fail_updates: Mutex<bool>,
    pub handlebar_requests: Mutex<Vec<HandlebarRequest>>,
    pub refine_requests: Mutex<Vec<RefineRequest>>,
    pub uploads: Mutex<Vec<(DbId, String, usize)>>,
}

impl FakeBackend {
    pub fn with_project(project: Project) -> Arc<Self> {
        let backend = Self::default();
        *backend.project.lock().unwrap() = Some(project);
        Arc::new(backend)
    }

    pub fn push_variation(&self, pairs: &[(&str, &str)]) {
        self.push_variations(vec![pairs]);
    }

    pub fn push_variations(&self, variations: Vec<&[(&str, &str)]>) {
        let variations = variations.into_iter().map(|pairs| variation(pairs)).collect();
        self.generations.lock().unwrap().push_back(Ok(GenerationResponse {
            variations,
            original_text: String::new(),
            tone: String::new(),
            content_type: "newsletter".into(),
        }));
    }

    pub fn push_generation_error(&self, status: u16) {
        self.generations.lock().unwrap().push_back(Err(GatewayError::Api {
            operation: "generate content",
            status,
            body: "upstream error".into(),
        }));
    }

    pub fn fail_language(&self, lang: &str) {
        self.failing_languages.lock().unwrap().insert(lang.to_string());
    }

    pub fn generate_calls(&self) -> Vec<GenerationRequest> {
        self.generate_requests.lock().unwrap().clone()
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_requests.lock().unwrap().len()
    }

    pub fn translated_texts(&self) -> Vec<String> {
        self.translate_requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    pub fn last_save(&self) -> Option<SaveComponentsRequest> {
        self.saves.lock().unwrap().last().cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn updates(&self) -> Vec<ProjectUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

pub fn variation(pairs: &[(&str, &str)]) -> Variation {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait]
impl ContentGenerator for FakeBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GatewayError> {
        self.generate_requests.lock().unwrap().push(request.clone());
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::Decode {
                    operation: "generate content",
                    message: "no scripted response".into(),
                })
            })
    }
}

#[async_trait]
impl Translator for FakeBackend {
    async fn translate(
        &self,
        request: &TranslateRequest,
    ) -> Result<TranslateResponse, GatewayError> {
        self.translate_requests.lock().unwrap().push(request.clone());
        // Let concurrent calls interleave.
        tokio::task::yield_now().await;

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
        if *self.fail_updates.lock().unwrap() {
            return Err(GatewayError::Api {
                operation: "update project",
                status: 503,
                body: String::new(),
            });
        }
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
        self.handlebar_requests.lock().unwrap().push(request.clone());
        let mut template = String::new();
        for (lang, text) in &request.translations {
            template.push_str(&format!("{{{{#if (eq lang \"{lang}\")}}}}{text}{{{{else}}}}"));
        }
        template.push_str(&request.english_fallback);
        for _ in &request.translations {
            template.push_str("{{/if}}");
        }
        Ok(HandlebarResponse {
            component_key: request.component_key.clone(),
            handlebar_template: template,
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
            uploads.push((project_id, filename.to_string(), bytes.len()));
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
        self.refine_requests.lock().unwrap().push(request.clone());
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

pub fn collaborators(backend: &Arc<FakeBackend>) -> Collaborators {
    Collaborators {
        generator: backend.clone(),
        translator: backend.clone(),
        store: backend.clone(),
        exporter: backend.clone(),
        uploader: backend.clone(),
        assistant: backend.clone(),
    }
}

pub fn test_config() -> WorkflowConfig {
    WorkflowConfig {
        persistence: PersistenceConfig {
            debounce: Duration::from_millis(20),
            retry_delay: Duration::from_millis(10),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn project_json(structure: Value, components: Value, languages: &[&str]) -> Value {
    json!({
        "id": PROJECT_ID,
        "name": "Spring launch",
        "brief_text": "Announce the spring collection",
        "structure": structure,
        "tone": "professional",
        "target_languages": languages,
        "labels": [],
        "status": "in_progress",
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z",
        "components": components,
        "images": []
    })
}

pub fn project(structure: Value, components: Value, languages: &[&str]) -> Project {
    serde_json::from_value(project_json(structure, components, languages)).unwrap()
}

/// One section holding `components`, in order.
pub fn one_section(components: &[&str]) -> Value {
    json!([{"key": "s1", "name": "Hero", "components": components}])
}

/// A workflow and an open workspace over `project`.
pub async fn open(project: Project) -> (Arc<FakeBackend>, Workflow, ProjectWorkspace) {
    let backend = FakeBackend::with_project(project);
    let workflow = Workflow::new(collaborators(&backend), test_config());
    let ws = workflow.open_workspace(PROJECT_ID).await.unwrap();
    (backend, workflow, ws)
}
