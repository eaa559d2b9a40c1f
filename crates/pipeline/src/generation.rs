//! Whole-document generation.

use serde::{Deserialize, Serialize};

use mosaico_core::generation::{
    build_generation_request, merge_variation, total_count, validate_brief, validate_tone,
    GenerationParams, GenerationRequest, MergeReport, ModelMode, CONTENT_TYPE_NEWSLETTER,
};
use mosaico_core::project::ProjectUpdate;
use mosaico_core::structure::{section_from_entries, to_generation_structure, StructureEntry};
use mosaico_core::wire_key::WireKey;
use mosaico_core::ComponentType;
use mosaico_gateway::messages::{GenerationResponse, OptimizePromptRequest, OptimizePromptResponse};

use crate::outcome::{Outcome, WorkflowError};
use crate::workflow::Workflow;
use crate::workspace::ProjectWorkspace;

/// Inputs of a document generation. Absent fields fall back to the
/// workspace's current values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateInput {
    pub brief: Option<String>,
    pub tone: Option<String>,
    pub image_url: Option<String>,
    pub temperature: Option<f64>,
    #[serde(default)]
    pub model_hint: ModelMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub version: u64,
    pub mode: ModelMode,
    /// `true` when the quality request failed and fast mode answered.
    pub retried_fast: bool,
    #[serde(flatten)]
    pub merge: MergeReport,
    /// `true` when a default section was created for the generated slots.
    pub synthesized_section: bool,
}

impl Workflow {
    /// Generate every slot of the document from the brief and merge the
    /// first returned variation.
    pub async fn generate(
        &self,
        ws: &ProjectWorkspace,
        input: GenerateInput,
    ) -> Result<Outcome<GenerationReport>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;

        let brief = input.brief.unwrap_or_else(|| snap.brief.clone());
        let tone = input.tone.unwrap_or_else(|| snap.tone.clone());
        validate_tone(&tone)?;
        let temperature = input.temperature.unwrap_or(snap.temperature);
        let image_url = input.image_url.or_else(|| snap.image_url.clone());

        let request = build_generation_request(&GenerationParams {
            brief: &brief,
            tone: &tone,
            sections: &snap.sections,
            image_url: image_url.as_deref(),
            temperature,
            model_hint: input.model_hint,
        })?;

        tracing::info!(
            project_id = ws.project_id(),
            components = total_count(&request.structure),
            use_flash = request.use_flash,
            has_image = request.image_url.is_some(),
            "Generating content",
        );

        let (response, mode, retried_fast) = self.generate_with_fallback(request).await?;
        let variation = response.variations.into_iter().next().ok_or_else(|| {
            WorkflowError::InvalidResponse("Generator returned no variations".to_string())
        })?;

        let brief = brief.trim().to_string();
        let (snapshot, (merge, synthesized_section)) = ws
            .commit(|s| {
                let (registry, merge) = merge_variation(&s.registry, &variation);
                let mut next = s.clone();
                next.registry = registry;
                next.brief = brief.clone();
                next.tone = tone.clone();
                next.temperature = temperature;

                let has_free = s.sections.iter().any(|sec| !sec.components.is_empty());
                let entries = generated_free_entries(&merge);
                let synthesized = !has_free && !entries.is_empty();
                if synthesized {
                    next.sections = vec![section_from_entries(&entries)];
                }
                Ok((next, (merge, synthesized)))
            })
            .await?;

        tracing::info!(
            project_id = ws.project_id(),
            version = snapshot.version,
            applied = merge.applied.len(),
            dropped = merge.dropped.len(),
            "Generated content merged",
        );

        let mut outcome = Outcome::ok(GenerationReport {
            version: snapshot.version,
            mode,
            retried_fast,
            merge: merge.clone(),
            synthesized_section,
        })
        .warn_all(
            merge
                .dropped
                .iter()
                .map(|k| format!("Dropped generated content with unrecognized key '{k}'")),
        );
        if retried_fast {
            outcome = outcome.warn("Quality generation failed; content was generated in fast mode");
        }

        let update = ProjectUpdate {
            brief_text: (brief != snap.brief).then(|| snapshot.brief.clone()),
            tone: (snapshot.tone != snap.tone).then(|| snapshot.tone.clone()),
            structure: synthesized_section.then(|| snapshot.sections.clone()),
            ..Default::default()
        };
        if let Some(warning) = self.sync_project(ws, &update).await {
            outcome = outcome.warn(warning);
        }

        Ok(outcome)
    }

    /// Ask the assistant for an improved brief for the current structure.
    pub async fn optimize_prompt(
        &self,
        ws: &ProjectWorkspace,
        brief: Option<String>,
        tone: Option<String>,
    ) -> Result<Outcome<OptimizePromptResponse>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;
        let brief = brief.unwrap_or_else(|| snap.brief.clone());
        let tone = tone.unwrap_or_else(|| snap.tone.clone());
        validate_brief(&brief)?;
        validate_tone(&tone)?;

        let request = OptimizePromptRequest {
            text: brief.trim().to_string(),
            content_type: CONTENT_TYPE_NEWSLETTER.to_string(),
            tone,
            structure: to_generation_structure(&snap.sections),
        };
        let response = self.collaborators.assistant.optimize_prompt(&request).await?;
        tracing::info!(
            project_id = ws.project_id(),
            improvements = response.improvements.len(),
            "Prompt optimized",
        );
        Ok(Outcome::ok(response))
    }

    // ---- private helpers ----

    /// Call the generator; a transient failure in quality mode is retried
    /// once in fast mode.
    async fn generate_with_fallback(
        &self,
        request: GenerationRequest,
    ) -> Result<(GenerationResponse, ModelMode, bool), WorkflowError> {
        let generator = &self.collaborators.generator;
        let mode = if request.use_flash {
            ModelMode::Fast
        } else {
            ModelMode::Quality
        };

        match generator.generate(&request).await {
            Ok(response) => Ok((response, mode, false)),
            Err(e) if mode == ModelMode::Quality && e.is_transient() => {
                tracing::warn!(error = %e, attempt = 2, "Quality generation failed, retrying in fast mode");
                let fast = GenerationRequest {
                    use_flash: true,
                    ..request
                };
                let response = generator.generate(&fast).await?;
                Ok((response, ModelMode::Fast, true))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Per-type counts of the generated free-instance slots, from the highest
/// index written for each type.
fn generated_free_entries(merge: &MergeReport) -> Vec<StructureEntry> {
    ComponentType::GENERATED_FREE
        .into_iter()
        .filter_map(|component| {
            let count = merge
                .applied
                .iter()
                .filter_map(|key| match WireKey::parse(key) {
                    WireKey::Parsed {
                        component_type,
                        index,
                    } if component_type == component => Some(index),
                    _ => None,
                })
                .max()?;
            Some(StructureEntry { component, count })
        })
        .collect()
}
