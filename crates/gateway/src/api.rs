//! REST client for the content backend.
//!
//! Wraps generation, translation, handlebar export, image upload, refine,
//! prompt optimization and project CRUD using [`reqwest`]. Every request
//! carries the bearer token from the configured [`TokenProvider`] when one is
//! available.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use mosaico_core::generation::GenerationRequest;
use mosaico_core::project::{ImageRecord, Project, ProjectUpdate, SaveComponentsRequest};
use mosaico_core::types::DbId;

use crate::auth::{NoToken, TokenProvider};
use crate::messages::{
    GenerationResponse, HandlebarRequest, HandlebarResponse, OptimizePromptRequest,
    OptimizePromptResponse, RefineRequest, RefineResponse, SaveComponentsResponse,
    TranslateRequest, TranslateResponse,
};

/// HTTP client for one content backend.
#[derive(Clone)]
pub struct MosaicoApi {
    client: reqwest::Client,
    api_url: String,
    tokens: Arc<dyn TokenProvider>,
}

/// Errors from the content backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Failed to {operation}: {status}")]
    Api {
        operation: &'static str,
        status: u16,
        /// Raw response body for diagnostics.
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Failed to {operation}: invalid response ({message})")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl GatewayError {
    /// `true` for failures worth one retry in a cheaper mode: server-side
    /// errors, timeouts, refused connections and unparsable responses.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Api { status, .. } => *status >= 500,
            GatewayError::Decode { .. } => true,
            GatewayError::Request(e) => e.is_timeout() || e.is_connect(),
        }
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            GatewayError::Request(e) => e.status().map(|s| s.as_u16()),
            GatewayError::Decode { .. } => None,
        }
    }
}

impl MosaicoApi {
    /// Create a client without authentication.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8080`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, Arc::new(NoToken))
    }

    /// Create a client reusing an existing [`reqwest::Client`] and token
    /// provider.
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_url,
            tokens,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- content ----

    /// `POST /api/v1/generate`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GatewayError> {
        self.post_json("/api/v1/generate", request, "generate content")
            .await
    }

    /// `POST /api/v1/translate` for one text and one language.
    pub async fn translate(
        &self,
        request: &TranslateRequest,
    ) -> Result<TranslateResponse, GatewayError> {
        self.post_json("/api/v1/translate", request, "translate content")
            .await
    }

    /// `POST /api/v1/handlebars/generate`.
    pub async fn generate_handlebar(
        &self,
        request: &HandlebarRequest,
    ) -> Result<HandlebarResponse, GatewayError> {
        self.post_json("/api/v1/handlebars/generate", request, "generate handlebar")
            .await
    }

    /// `POST /api/v1/refine`.
    pub async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, GatewayError> {
        self.post_json("/api/v1/refine", request, "refine text").await
    }

    /// `POST /api/v1/optimize-prompt`.
    pub async fn optimize_prompt(
        &self,
        request: &OptimizePromptRequest,
    ) -> Result<OptimizePromptResponse, GatewayError> {
        self.post_json("/api/v1/optimize-prompt", request, "optimize prompt")
            .await
    }

    /// `POST /api/v1/upload-image` as multipart with `file` and `project_id`.
    pub async fn upload_image(
        &self,
        project_id: DbId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageRecord, GatewayError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("project_id", project_id.to_string());

        let request = self
            .authorized(self.client.post(self.url("/api/v1/upload-image")))
            .await
            .multipart(form);
        Self::parse_response(request.send().await?, "upload image").await
    }

    // ---- projects ----

    /// `GET /api/v1/projects`.
    pub async fn list_projects(&self) -> Result<Vec<Project>, GatewayError> {
        let request = self
            .authorized(self.client.get(self.url("/api/v1/projects")))
            .await;
        Self::parse_response(request.send().await?, "fetch projects").await
    }

    /// `GET /api/v1/projects/{id}`.
    pub async fn get_project(&self, project_id: DbId) -> Result<Project, GatewayError> {
        let request = self
            .authorized(self.client.get(self.url(&format!("/api/v1/projects/{project_id}"))))
            .await;
        Self::parse_response(request.send().await?, "fetch project").await
    }

    /// `PUT /api/v1/projects/{id}`.
    pub async fn update_project(
        &self,
        project_id: DbId,
        update: &ProjectUpdate,
    ) -> Result<Project, GatewayError> {
        let request = self
            .authorized(self.client.put(self.url(&format!("/api/v1/projects/{project_id}"))))
            .await
            .json(update);
        Self::parse_response(request.send().await?, "update project").await
    }

    /// `POST /api/v1/projects/{id}/components`.
    pub async fn save_components(
        &self,
        project_id: DbId,
        request: &SaveComponentsRequest,
    ) -> Result<SaveComponentsResponse, GatewayError> {
        self.post_json(
            &format!("/api/v1/projects/{project_id}/components"),
            request,
            "save components",
        )
        .await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .authorized(self.client.post(self.url(path)))
            .await
            .json(body);
        Self::parse_response(request.send().await?, operation).await
    }

    /// Ensure the response has a success status code. On failure the body is
    /// read for diagnostics and logged.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(operation, status = status.as_u16(), body = %body, "Backend request failed");
            return Err(GatewayError::Api {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<T, GatewayError> {
        let response = Self::ensure_success(response, operation).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GatewayError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_names_operation_and_status() {
        let err = GatewayError::Api {
            operation: "generate content",
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Failed to generate content: 502");
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = GatewayError::Api {
            operation: "generate content",
            status: 422,
            body: String::new(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn decode_errors_are_transient() {
        let err = GatewayError::Decode {
            operation: "generate content",
            message: "expected value".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = MosaicoApi::new("http://localhost:8080/");
        assert_eq!(api.api_url(), "http://localhost:8080");
    }
}
