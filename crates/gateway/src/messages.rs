//! Request and response bodies of the content backend endpoints.
//!
//! Generation requests and translation batches are domain types and live in
//! `mosaico_core`; this module holds the remaining wire shapes.

use serde::{Deserialize, Serialize};

use mosaico_core::generation::{Variation, CONTENT_TYPE_NEWSLETTER};
use mosaico_core::language::SOURCE_LANGUAGE;
use mosaico_core::structure::StructureEntry;
use mosaico_core::types::DbId;
use mosaico_core::TranslationMap;

/// Response of `POST /api/v1/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub variations: Vec<Variation>,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub content_type: String,
}

/// Body of `POST /api/v1/translate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    pub maintain_tone: bool,
    pub content_type: String,
}

impl TranslateRequest {
    /// English newsletter copy into `target_language`, keeping the tone.
    pub fn newsletter(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            source_language: Some(SOURCE_LANGUAGE.to_string()),
            maintain_tone: true,
            content_type: CONTENT_TYPE_NEWSLETTER.to_string(),
        }
    }
}

/// Response of `POST /api/v1/translate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub source_language: String,
    #[serde(default)]
    pub target_language: String,
}

/// Body of `POST /api/v1/handlebars/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlebarRequest {
    pub component_key: String,
    pub translations: TranslationMap,
    pub english_fallback: String,
}

/// Response of `POST /api/v1/handlebars/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlebarResponse {
    pub component_key: String,
    pub handlebar_template: String,
}

/// One-click text improvements offered by the refine endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineOperation {
    Shorten,
    FixGrammar,
    ImproveClarity,
    MakeFormal,
    MakeCasual,
}

impl RefineOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            RefineOperation::Shorten => "shorten",
            RefineOperation::FixGrammar => "fix_grammar",
            RefineOperation::ImproveClarity => "improve_clarity",
            RefineOperation::MakeFormal => "make_formal",
            RefineOperation::MakeCasual => "make_casual",
        }
    }
}

/// Body of `POST /api/v1/refine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineRequest {
    pub text: String,
    pub operation: RefineOperation,
    pub content_type: String,
}

/// Response of `POST /api/v1/refine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineResponse {
    pub refined_text: String,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub operation: String,
}

/// Response of `POST /api/v1/projects/{id}/components`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveComponentsResponse {
    pub project_id: DbId,
    pub saved_count: usize,
}

/// Body of `POST /api/v1/optimize-prompt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizePromptRequest {
    pub text: String,
    pub content_type: String,
    pub tone: String,
    pub structure: Vec<StructureEntry>,
}

/// Response of `POST /api/v1/optimize-prompt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizePromptResponse {
    pub optimized_prompt: String,
    #[serde(default)]
    pub improvements: Vec<String>,
}
