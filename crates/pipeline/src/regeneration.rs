//! Single-slot regeneration, manual edits and refinement.
//!
//! Every write path ends in `write_slot`, which stores the
//! normalized content, closes any open draft and re-translates the record
//! when it already had translations.

use serde::Serialize;

use mosaico_core::edit::SlotEditState;
use mosaico_core::error::CoreError;
use mosaico_core::generation::CONTENT_TYPE_NEWSLETTER;
use mosaico_core::regeneration::{
    build_regeneration_request, candidate_from_variation, document_context,
    pick_distinct_candidate, RegenerationContext,
};
use mosaico_core::wire_key::format_wire_key;
use mosaico_core::{ComponentType, TranslationMap};
use mosaico_gateway::messages::{RefineOperation, RefineRequest};

use crate::outcome::{Outcome, WorkflowError};
use crate::workflow::Workflow;
use crate::workspace::ProjectWorkspace;

/// State of one slot after a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotUpdate {
    pub version: u64,
    pub component_type: ComponentType,
    pub component_index: u32,
    pub wire_key: String,
    pub content: String,
    pub translations: TranslationMap,
    /// `true` when the record was re-translated after the write.
    pub cascaded: bool,
}

/// Edit state of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotEdit {
    pub version: u64,
    pub wire_key: String,
    #[serde(flatten)]
    pub state: SlotEditState,
}

impl Workflow {
    /// Regenerate one slot with the rest of the document as context.
    ///
    /// Fails with [`CoreError::NoVariation`] and leaves the record unchanged
    /// when no candidate differs from the current content.
    pub async fn regenerate_single(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
    ) -> Result<Outcome<SlotUpdate>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;
        snap.edit_state(component_type, index).ensure_can_regenerate()?;

        let current = snap
            .registry
            .get(component_type, index)
            .map(|r| r.generated_content.clone())
            .unwrap_or_default();
        let document = document_context(&snap.registry, &snap.sections);
        let request = build_regeneration_request(&RegenerationContext {
            brief: &snap.brief,
            tone: &snap.tone,
            component_type,
            index,
            current: &current,
            document: &document,
            base_temperature: snap.temperature,
        })?;

        tracing::info!(
            project_id = ws.project_id(),
            component_type = %component_type,
            component_index = index,
            temperature = request.temperature,
            "Regenerating component",
        );

        let response = self.collaborators.generator.generate(&request).await?;
        let candidates = response
            .variations
            .iter()
            .filter_map(|v| candidate_from_variation(v, component_type));
        let Some(chosen) = pick_distinct_candidate(&current, candidates) else {
            tracing::warn!(
                project_id = ws.project_id(),
                component_type = %component_type,
                component_index = index,
                candidates = response.variations.len(),
                "Regeneration produced no distinct candidate",
            );
            return Err(CoreError::NoVariation {
                component_type,
                index,
                attempts: response.variations.len(),
            }
            .into());
        };

        self.write_slot(ws, component_type, index, chosen).await
    }

    /// Overwrite one slot with user-supplied content.
    pub async fn save_edit(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
        content: &str,
    ) -> Result<Outcome<SlotUpdate>, WorkflowError> {
        ws.ensure_open()?;
        validate_editable(component_type, content)?;
        self.write_slot(ws, component_type, index, content).await
    }

    /// Open a draft seeded with the slot's current content.
    pub async fn begin_edit(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
    ) -> Result<Outcome<SlotEdit>, WorkflowError> {
        ensure_text_slot(component_type)?;
        self.transition(ws, component_type, index, |state, current| {
            Ok(state.begin(current))
        })
        .await
    }

    /// Replace the open draft.
    pub async fn update_draft(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
        draft: &str,
    ) -> Result<Outcome<SlotEdit>, WorkflowError> {
        self.transition(ws, component_type, index, |state, _| Ok(state.update(draft)?))
            .await
    }

    /// Discard the open draft.
    pub async fn cancel_edit(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
    ) -> Result<Outcome<SlotEdit>, WorkflowError> {
        self.transition(ws, component_type, index, |state, _| Ok(state.cancel()))
            .await
    }

    /// Save the open draft as the slot's content.
    pub async fn save_draft(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
    ) -> Result<Outcome<SlotUpdate>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;
        let (_, draft) = snap.edit_state(component_type, index).save()?;
        validate_editable(component_type, &draft)?;
        self.write_slot(ws, component_type, index, &draft).await
    }

    /// Rewrite one slot with the refine assistant and save the result.
    pub async fn refine(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
        operation: RefineOperation,
    ) -> Result<Outcome<SlotUpdate>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;
        let record = snap.registry.require(component_type, index)?;
        validate_editable(component_type, &record.generated_content)?;

        let request = RefineRequest {
            text: record.generated_content.clone(),
            operation,
            content_type: CONTENT_TYPE_NEWSLETTER.to_string(),
        };
        let response = self.collaborators.assistant.refine(&request).await?;
        if response.refined_text.trim().is_empty() {
            return Err(WorkflowError::InvalidResponse(format!(
                "Refine '{}' returned no text",
                operation.as_str()
            )));
        }

        tracing::info!(
            project_id = ws.project_id(),
            component_type = %component_type,
            component_index = index,
            operation = operation.as_str(),
            "Component refined",
        );
        self.write_slot(ws, component_type, index, &response.refined_text)
            .await
    }

    // ---- private helpers ----

    /// Store `content`, close the slot's draft, and re-translate the record
    /// if it had translations at write time.
    async fn write_slot(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
        content: &str,
    ) -> Result<Outcome<SlotUpdate>, WorkflowError> {
        let (mut snapshot, had_translations) = ws
            .commit(|s| {
                let had_translations = s
                    .registry
                    .get(component_type, index)
                    .is_some_and(|r| !r.translations.is_empty());
                let mut next =
                    s.with_edit_state(component_type, index, SlotEditState::Viewing);
                next.registry = s.registry.upsert(component_type, index, content);
                Ok((next, had_translations))
            })
            .await?;

        tracing::info!(
            project_id = ws.project_id(),
            component_type = %component_type,
            component_index = index,
            version = snapshot.version,
            "Component updated",
        );

        let mut warnings = Vec::new();
        let mut cascaded = false;
        if had_translations {
            match self.translate_component(ws, component_type, index).await {
                Ok(outcome) => {
                    cascaded = true;
                    warnings.extend(outcome.warnings);
                    snapshot = ws.snapshot().await;
                }
                Err(WorkflowError::Stale(id)) => return Err(WorkflowError::Stale(id)),
                Err(e) => {
                    tracing::warn!(
                        project_id = ws.project_id(),
                        component_type = %component_type,
                        component_index = index,
                        error = %e,
                        "Re-translation after update failed",
                    );
                    warnings.push(format!("Translations were not updated: {e}"));
                }
            }
        }

        let record = snapshot.registry.require(component_type, index)?;
        Ok(Outcome::ok(SlotUpdate {
            version: snapshot.version,
            component_type,
            component_index: index,
            wire_key: record.wire_key(),
            content: record.generated_content.clone(),
            translations: record.translations.clone(),
            cascaded,
        })
        .warn_all(warnings))
    }

    /// Apply an edit state transition to one slot. Drafts live only in the
    /// workspace and are not persisted.
    async fn transition<F>(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
        f: F,
    ) -> Result<Outcome<SlotEdit>, WorkflowError>
    where
        F: FnOnce(SlotEditState, &str) -> Result<SlotEditState, WorkflowError>,
    {
        let (snapshot, state) = ws
            .update(|s| {
                let current = s
                    .registry
                    .get(component_type, index)
                    .map(|r| r.generated_content.as_str())
                    .unwrap_or_default();
                let state = f(s.edit_state(component_type, index), current)?;
                Ok((s.with_edit_state(component_type, index, state.clone()), state))
            })
            .await?;

        Ok(Outcome::ok(SlotEdit {
            version: snapshot.version,
            wire_key: format_wire_key(component_type, index),
            state,
        }))
    }
}

fn ensure_text_slot(component_type: ComponentType) -> Result<(), CoreError> {
    if component_type.is_generated() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "'{component_type}' slots hold uploaded media, not text"
        )))
    }
}

fn validate_editable(component_type: ComponentType, content: &str) -> Result<(), CoreError> {
    ensure_text_slot(component_type)?;
    if content.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "Content for '{component_type}' must not be empty"
        )));
    }
    Ok(())
}
