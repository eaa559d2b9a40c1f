//! Generation request construction, validation and model selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentType;
use crate::error::CoreError;
use crate::registry::ComponentRegistry;
use crate::structure::{to_generation_structure, StructureEntry, StructureSection};
use crate::wire_key::{format_wire_key, WireKey};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Content type sent for every email document.
pub const CONTENT_TYPE_NEWSLETTER: &str = "newsletter";

/// Default sampling temperature for document generation.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Requested component total at which an image-backed request is considered
/// complex enough for the model-selection policy.
pub const COMPLEX_REQUEST_THRESHOLD: u32 = 5;

/// Maximum brief length accepted by the generator.
pub const MAX_BRIEF_LENGTH: usize = 1_000;

/// Tones offered to users.
pub const VALID_TONES: &[&str] = &["professional", "casual", "enthusiastic", "elegant", "direct"];

/// Default tone when a project has none.
pub const DEFAULT_TONE: &str = "professional";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Generation quality tier requested from the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMode {
    /// Higher-quality, slower generation.
    #[default]
    Quality,
    /// Faster, cheaper generation.
    Fast,
}

impl ModelMode {
    pub fn use_flash(self) -> bool {
        matches!(self, ModelMode::Fast)
    }
}

/// Body of `POST /api/v1/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The creative brief.
    pub text: String,
    pub count: u32,
    pub tone: String,
    pub content_type: String,
    pub structure: Vec<StructureEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub temperature: f64,
    pub use_flash: bool,
    pub use_few_shot: bool,
}

/// One candidate set of generated content: wire key → text.
pub type Variation = BTreeMap<String, String>;

/// Inputs for building a document generation request.
#[derive(Debug, Clone)]
pub struct GenerationParams<'a> {
    pub brief: &'a str,
    pub tone: &'a str,
    pub sections: &'a [StructureSection],
    pub image_url: Option<&'a str>,
    pub temperature: f64,
    pub model_hint: ModelMode,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a creative brief: must contain non-whitespace text and fit the
/// generator's limit.
pub fn validate_brief(brief: &str) -> Result<(), CoreError> {
    if brief.trim().is_empty() {
        return Err(CoreError::Validation(
            "Please enter a creative brief first".to_string(),
        ));
    }
    if brief.len() > MAX_BRIEF_LENGTH {
        return Err(CoreError::Validation(format!(
            "Brief exceeds maximum length of {MAX_BRIEF_LENGTH} characters (got {})",
            brief.len()
        )));
    }
    Ok(())
}

/// Validate a tone against the offered set.
pub fn validate_tone(tone: &str) -> Result<(), CoreError> {
    if VALID_TONES.contains(&tone) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid tone '{tone}'. Must be one of: {}",
            VALID_TONES.join(", ")
        )))
    }
}

/// Validate a sampling temperature: must lie in `[0, 1]`.
pub fn validate_temperature(temperature: f64) -> Result<(), CoreError> {
    if (0.0..=1.0).contains(&temperature) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Temperature must be between 0.0 and 1.0 (got {temperature})"
        )))
    }
}

/// Validate that a flat structure requests at least one component.
pub fn validate_structure(structure: &[StructureEntry]) -> Result<(), CoreError> {
    if total_count(structure) == 0 {
        return Err(CoreError::Validation(
            "Structure must contain at least one component".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

/// Total number of requested component instances.
pub fn total_count(structure: &[StructureEntry]) -> u32 {
    structure.iter().map(|e| e.count).sum()
}

fn requests(structure: &[StructureEntry], component_type: ComponentType) -> bool {
    structure
        .iter()
        .any(|e| e.component == component_type && e.count > 0)
}

/// Pick the generation mode.
///
/// An image-backed request with at least [`COMPLEX_REQUEST_THRESHOLD`]
/// components goes to the fast mode when it asks for no body copy and to the
/// quality mode when it does. Every other request uses `hint`.
pub fn select_model_mode(
    structure: &[StructureEntry],
    has_image: bool,
    hint: ModelMode,
) -> ModelMode {
    if has_image && total_count(structure) >= COMPLEX_REQUEST_THRESHOLD {
        if requests(structure, ComponentType::Body) {
            ModelMode::Quality
        } else {
            ModelMode::Fast
        }
    } else {
        hint
    }
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

/// Validate inputs and build the generation request for a whole document.
///
/// Fails with [`CoreError::Validation`] before anything is sent when the
/// brief is blank, the temperature is out of range or the structure is empty.
pub fn build_generation_request(
    params: &GenerationParams<'_>,
) -> Result<GenerationRequest, CoreError> {
    validate_brief(params.brief)?;
    validate_temperature(params.temperature)?;

    let structure = to_generation_structure(params.sections);
    validate_structure(&structure)?;

    let image_url = params
        .image_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let mode = select_model_mode(&structure, image_url.is_some(), params.model_hint);

    Ok(GenerationRequest {
        text: params.brief.trim().to_string(),
        count: 1,
        tone: params.tone.to_string(),
        content_type: CONTENT_TYPE_NEWSLETTER.to_string(),
        structure,
        context: None,
        image_url,
        temperature: params.temperature,
        use_flash: mode.use_flash(),
        use_few_shot: true,
    })
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Keys applied and dropped while merging one variation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Canonical wire keys of the slots that were written.
    pub applied: Vec<String>,
    /// Raw keys that could not be parsed.
    pub dropped: Vec<String>,
}

/// Merge a generated variation into the registry.
///
/// Every key is parsed into `(type, index)` (a missing suffix means 1), the
/// text is normalized for its type and upserted. Unparsable keys are dropped.
pub fn merge_variation(
    registry: &ComponentRegistry,
    variation: &Variation,
) -> (ComponentRegistry, MergeReport) {
    let mut next = registry.clone();
    let mut report = MergeReport::default();

    for (key, text) in variation {
        match WireKey::parse(key) {
            WireKey::Parsed {
                component_type,
                index,
            } => {
                next = next.upsert(component_type, index, text);
                report.applied.push(format_wire_key(component_type, index));
            }
            WireKey::Unparsable(raw) => {
                tracing::warn!(key = %raw, "Dropping generated content with unparsable key");
                report.dropped.push(raw);
            }
        }
    }

    (next, report)
}
