//! Seams to the external services the workflow depends on.
//!
//! Each trait covers one collaborator. [`MosaicoApi`] implements all of them;
//! tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use mosaico_core::generation::GenerationRequest;
use mosaico_core::project::{ImageRecord, Project, ProjectUpdate, SaveComponentsRequest};
use mosaico_core::types::DbId;
use mosaico_gateway::messages::{
    GenerationResponse, HandlebarRequest, HandlebarResponse, OptimizePromptRequest,
    OptimizePromptResponse, RefineRequest, RefineResponse, SaveComponentsResponse,
    TranslateRequest, TranslateResponse,
};
use mosaico_gateway::{GatewayError, MosaicoApi};

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GatewayError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one text into one language.
    async fn translate(&self, request: &TranslateRequest)
        -> Result<TranslateResponse, GatewayError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get_project(&self, project_id: DbId) -> Result<Project, GatewayError>;

    async fn update_project(
        &self,
        project_id: DbId,
        update: &ProjectUpdate,
    ) -> Result<Project, GatewayError>;

    async fn save_components(
        &self,
        project_id: DbId,
        request: &SaveComponentsRequest,
    ) -> Result<SaveComponentsResponse, GatewayError>;
}

#[async_trait]
pub trait HandlebarExporter: Send + Sync {
    async fn generate_handlebar(
        &self,
        request: &HandlebarRequest,
    ) -> Result<HandlebarResponse, GatewayError>;
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload_image(
        &self,
        project_id: DbId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageRecord, GatewayError>;
}

/// Refine and prompt-optimization helpers.
#[async_trait]
pub trait TextAssistant: Send + Sync {
    async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, GatewayError>;

    async fn optimize_prompt(
        &self,
        request: &OptimizePromptRequest,
    ) -> Result<OptimizePromptResponse, GatewayError>;
}

/// The full set of collaborators a [`crate::Workflow`] talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn ContentGenerator>,
    pub translator: Arc<dyn Translator>,
    pub store: Arc<dyn ProjectStore>,
    pub exporter: Arc<dyn HandlebarExporter>,
    pub uploader: Arc<dyn MediaUploader>,
    pub assistant: Arc<dyn TextAssistant>,
}

impl Collaborators {
    /// Route every collaborator through one backend client.
    pub fn from_api(api: Arc<MosaicoApi>) -> Self {
        Self {
            generator: api.clone(),
            translator: api.clone(),
            store: api.clone(),
            exporter: api.clone(),
            uploader: api.clone(),
            assistant: api,
        }
    }
}

// ---------------------------------------------------------------------------
// MosaicoApi implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl ContentGenerator for MosaicoApi {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GatewayError> {
        MosaicoApi::generate(self, request).await
    }
}

#[async_trait]
impl Translator for MosaicoApi {
    async fn translate(
        &self,
        request: &TranslateRequest,
    ) -> Result<TranslateResponse, GatewayError> {
        MosaicoApi::translate(self, request).await
    }
}

#[async_trait]
impl ProjectStore for MosaicoApi {
    async fn get_project(&self, project_id: DbId) -> Result<Project, GatewayError> {
        MosaicoApi::get_project(self, project_id).await
    }

    async fn update_project(
        &self,
        project_id: DbId,
        update: &ProjectUpdate,
    ) -> Result<Project, GatewayError> {
        MosaicoApi::update_project(self, project_id, update).await
    }

    async fn save_components(
        &self,
        project_id: DbId,
        request: &SaveComponentsRequest,
    ) -> Result<SaveComponentsResponse, GatewayError> {
        MosaicoApi::save_components(self, project_id, request).await
    }
}

#[async_trait]
impl HandlebarExporter for MosaicoApi {
    async fn generate_handlebar(
        &self,
        request: &HandlebarRequest,
    ) -> Result<HandlebarResponse, GatewayError> {
        MosaicoApi::generate_handlebar(self, request).await
    }
}

#[async_trait]
impl MediaUploader for MosaicoApi {
    async fn upload_image(
        &self,
        project_id: DbId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageRecord, GatewayError> {
        MosaicoApi::upload_image(self, project_id, filename, bytes).await
    }
}

#[async_trait]
impl TextAssistant for MosaicoApi {
    async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, GatewayError> {
        MosaicoApi::refine(self, request).await
    }

    async fn optimize_prompt(
        &self,
        request: &OptimizePromptRequest,
    ) -> Result<OptimizePromptResponse, GatewayError> {
        MosaicoApi::optimize_prompt(self, request).await
    }
}
