//! Project records as exchanged with the project store, and their conversion
//! into the in-memory document model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::language::TargetLanguageSet;
use crate::registry::{ComponentRecord, ComponentRegistry};
use crate::structure::{normalize, validate_sections, StructureSection};
use crate::types::{DbId, Timestamp};

/// Maximum length of a project name.
pub const MAX_PROJECT_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    InProgress,
    Approved,
}

/// Image metadata attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: DbId,
    pub project_id: DbId,
    pub filename: String,
    #[serde(default)]
    pub gcs_path: String,
    #[serde(default)]
    pub gcs_public_url: Option<String>,
    pub uploaded_at: Timestamp,
}

/// A project as returned by the project store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub brief_text: Option<String>,
    /// Raw stored structure, either the section shape or the legacy flat one.
    #[serde(default)]
    pub structure: Value,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub target_languages: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub created_by_user_id: Option<String>,
    #[serde(default)]
    pub created_by_user_name: Option<String>,
    #[serde(default)]
    pub updated_by_user_id: Option<String>,
    #[serde(default)]
    pub updated_by_user_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

/// The editable document derived from a stored project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectDocument {
    pub sections: Vec<StructureSection>,
    pub registry: ComponentRegistry,
    pub languages: TargetLanguageSet,
}

impl Project {
    /// Normalize the stored structure, components and languages.
    pub fn document(&self) -> ProjectDocument {
        ProjectDocument {
            sections: normalize(&self.structure),
            registry: ComponentRegistry::from_records(self.components.clone()),
            languages: TargetLanguageSet::from_stored(&self.target_languages),
        }
    }
}

/// Partial update sent with `PUT /api/v1/projects/{id}`. Absent fields are
/// left unchanged by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Vec<StructureSection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProjectUpdate::default()
    }

    /// Validate and normalize user-supplied fields in place.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        if let Some(name) = &self.name {
            validate_project_name(name)?;
            self.name = Some(name.trim().to_string());
        }
        if let Some(sections) = &self.structure {
            validate_sections(sections)?;
        }
        if let Some(labels) = self.labels.take() {
            self.labels = Some(normalize_labels(&labels));
        }
        if let Some(languages) = self.target_languages.take() {
            self.target_languages = Some(TargetLanguageSet::parse(&languages)?.to_vec());
        }
        Ok(self)
    }
}

/// Body of `POST /api/v1/projects/{id}/components`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveComponentsRequest {
    pub components: Vec<ComponentRecord>,
}

pub fn validate_project_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Project name must not be empty".to_string()));
    }
    if trimmed.len() > MAX_PROJECT_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Project name exceeds maximum length of {MAX_PROJECT_NAME_LENGTH} characters (got {})",
            trimmed.len()
        )));
    }
    Ok(())
}

/// Trim labels, drop blanks and duplicates, keep first-seen order.
pub fn normalize_labels(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}
