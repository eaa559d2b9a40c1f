//! Batch translation for whole-document and single-component scopes, and
//! target language changes.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use mosaico_core::language::TargetLanguageSet;
use mosaico_core::project::ProjectUpdate;
use mosaico_core::translation::{
    component_text, document_texts, failure_sentinel, merge_component, merge_document,
    validate_target_languages, FailedTranslation, TranslationBatch, TranslationText,
};
use mosaico_core::wire_key::format_wire_key;
use mosaico_core::{ComponentType, TranslationMap};
use mosaico_gateway::messages::TranslateRequest;

use crate::outcome::{Outcome, WorkflowError};
use crate::workflow::Workflow;
use crate::workspace::ProjectWorkspace;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationReport {
    pub version: u64,
    /// Wire keys that were sent for translation.
    pub keys: Vec<String>,
    pub languages: Vec<String>,
    /// `true` when at least one (key, language) pair failed.
    pub partial: bool,
    pub failures: Vec<FailedTranslation>,
    /// Keys edited while the batch was in flight; their results were dropped.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outdated: Vec<String>,
}

/// Result of a single-component translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentTranslation {
    pub component_type: ComponentType,
    pub component_index: u32,
    pub wire_key: String,
    pub translations: TranslationMap,
    #[serde(flatten)]
    pub report: TranslationReport,
}

impl Workflow {
    /// Translate `texts` into every language in `languages`.
    ///
    /// Every (key, language) pair is one translation call; calls run
    /// concurrently up to the configured limit. A failed pair is stored as a
    /// failure placeholder and listed in [`TranslationBatch::failures`]; the
    /// other pairs are unaffected.
    pub async fn translate_batch(
        &self,
        texts: &[TranslationText],
        languages: &[String],
    ) -> Result<TranslationBatch, WorkflowError> {
        if texts.is_empty() {
            return Ok(TranslationBatch::default());
        }
        validate_target_languages(languages)?;

        let pairs: Vec<(String, String, String)> = texts
            .iter()
            .flat_map(|text| {
                languages
                    .iter()
                    .filter(|l| !l.trim().is_empty())
                    .map(move |lang| (text.key.clone(), text.content.clone(), lang.clone()))
            })
            .collect();

        let translator = Arc::clone(&self.collaborators.translator);
        let results: Vec<_> = stream::iter(pairs)
            .map(move |(key, content, lang)| {
                let translator = Arc::clone(&translator);
                async move {
                    let request = TranslateRequest::newsletter(content, lang.clone());
                    let result = translator.translate(&request).await;
                    (key, lang, result)
                }
            })
            .buffer_unordered(self.config.translation_concurrency.max(1))
            .collect()
            .await;

        let mut batch = TranslationBatch {
            sources: texts
                .iter()
                .map(|t| (t.key.clone(), t.content.clone()))
                .collect(),
            ..Default::default()
        };
        for (key, lang, result) in results {
            let text = match result {
                Ok(resp) => resp.translated_text,
                Err(e) => {
                    tracing::warn!(key = %key, language = %lang, error = %e, "Translation failed");
                    batch.failures.push(FailedTranslation {
                        key: key.clone(),
                        language: lang.clone(),
                        error: e.to_string(),
                    });
                    failure_sentinel(&e.to_string())
                }
            };
            batch.translations.entry(key).or_default().insert(lang, text);
        }
        batch.failures.sort_by(|a, b| (&a.key, &a.language).cmp(&(&b.key, &b.language)));

        Ok(batch)
    }

    /// Translate every slot of the document into the current target set.
    ///
    /// Each translated record's map is replaced by the fresh result and every
    /// record is pruned to the target set. Orphaned records are not sent.
    pub async fn translate_document(
        &self,
        ws: &ProjectWorkspace,
    ) -> Result<Outcome<TranslationReport>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;
        if snap.languages.is_empty() {
            return Err(WorkflowError::validation(
                "Select at least one target language to translate",
            ));
        }

        let texts = document_texts(&snap.registry, &snap.sections);
        let languages = snap.languages.to_vec();
        tracing::info!(
            project_id = ws.project_id(),
            texts = texts.len(),
            languages = languages.len(),
            "Translating document",
        );

        let batch = self.translate_batch(&texts, &languages).await?;
        // Merge against the languages targeted now; a language removed
        // while the batch was in flight must not come back.
        let (snapshot, outdated) = ws
            .commit(|s| {
                let merged = merge_document(&s.registry, &batch, &s.languages);
                let mut next = s.clone();
                next.registry = merged.registry;
                Ok((next, merged.outdated))
            })
            .await?;

        let report = TranslationReport {
            version: snapshot.version,
            keys: texts.into_iter().map(|t| t.key).collect(),
            languages,
            partial: batch.is_partial(),
            failures: batch.failures.clone(),
            outdated,
        };
        let outcome = outdated_warning(Outcome::ok(report.clone()), &report.outdated);
        Ok(partial_warning(outcome, &batch))
    }

    /// Translate one record into the current target set, leaving every other
    /// record untouched.
    pub async fn translate_component(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
    ) -> Result<Outcome<ComponentTranslation>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;
        if snap.languages.is_empty() {
            return Err(WorkflowError::validation(
                "Select at least one target language to translate",
            ));
        }
        let text = component_text(&snap.registry, component_type, index)?;
        if text.content.trim().is_empty() {
            return Err(WorkflowError::validation(format!(
                "'{}' has no content to translate",
                text.key
            )));
        }

        let languages = snap.languages.to_vec();
        let batch = self.translate_batch(std::slice::from_ref(&text), &languages).await?;
        let (snapshot, outdated) = ws
            .commit(|s| {
                let merged =
                    merge_component(&s.registry, component_type, index, &batch, &s.languages)?;
                let mut next = s.clone();
                next.registry = merged.registry;
                Ok((next, merged.outdated))
            })
            .await?;

        tracing::info!(
            project_id = ws.project_id(),
            component_type = %component_type,
            component_index = index,
            partial = batch.is_partial(),
            "Component translated",
        );

        let translations = snapshot
            .registry
            .get(component_type, index)
            .map(|r| r.translations.clone())
            .unwrap_or_default();
        let result = ComponentTranslation {
            component_type,
            component_index: index,
            wire_key: format_wire_key(component_type, index),
            translations,
            report: TranslationReport {
                version: snapshot.version,
                keys: vec![text.key],
                languages,
                partial: batch.is_partial(),
                failures: batch.failures.clone(),
                outdated: outdated.clone(),
            },
        };
        let outcome = outdated_warning(Outcome::ok(result), &outdated);
        Ok(partial_warning(outcome, &batch))
    }

    /// Replace the target language set. Languages no longer targeted are
    /// pruned from every record immediately.
    pub async fn set_target_languages(
        &self,
        ws: &ProjectWorkspace,
        languages: &[String],
    ) -> Result<Outcome<TargetLanguageSet>, WorkflowError> {
        let set = TargetLanguageSet::parse(languages)?;
        let (snapshot, removed) = ws
            .commit(|s| {
                let removed: Vec<String> = s
                    .languages
                    .iter()
                    .filter(|l| !set.contains(l))
                    .map(str::to_string)
                    .collect();
                let mut next = s.clone();
                next.registry = s.registry.prune_languages(&set);
                next.languages = set.clone();
                Ok((next, removed))
            })
            .await?;

        tracing::info!(
            project_id = ws.project_id(),
            languages = ?snapshot.languages.to_vec(),
            removed = ?removed,
            "Target languages changed",
        );

        let update = ProjectUpdate {
            target_languages: Some(snapshot.languages.to_vec()),
            ..Default::default()
        };
        let mut outcome = Outcome::ok(snapshot.languages.clone());
        if let Some(warning) = self.sync_project(ws, &update).await {
            outcome = outcome.warn(warning);
        }
        Ok(outcome)
    }
}

fn outdated_warning<T>(outcome: Outcome<T>, outdated: &[String]) -> Outcome<T> {
    if outdated.is_empty() {
        outcome
    } else {
        outcome.warn(format!(
            "Content changed during translation, translate again: {}",
            outdated.join(", ")
        ))
    }
}

fn partial_warning<T>(outcome: Outcome<T>, batch: &TranslationBatch) -> Outcome<T> {
    if batch.is_partial() {
        outcome.warn(format!(
            "{} translation(s) failed for: {}",
            batch.failures.len(),
            batch.failed_languages().join(", ")
        ))
    } else {
        outcome
    }
}
