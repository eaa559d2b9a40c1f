//! Translation batches and their merge rules.
//!
//! A whole-document pass is authoritative: every record it touches ends up
//! with exactly the freshly returned languages that are still targeted. A
//! single-component pass replaces the map of one record and leaves every
//! other record alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentType;
use crate::error::CoreError;
use crate::language::TargetLanguageSet;
use crate::registry::{slots, ComponentRegistry, TranslationMap};
use crate::structure::StructureSection;
use crate::wire_key::{format_wire_key, WireKey};

/// Prefix of the placeholder stored for a language whose translation failed.
pub const TRANSLATION_FAILED_PREFIX: &str = "[Translation failed:";

/// One text to translate, addressed by its wire key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationText {
    pub key: String,
    pub content: String,
}

/// Body of `POST /api/v1/translate/batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationBatchRequest {
    pub texts: Vec<TranslationText>,
    pub target_languages: Vec<String>,
}

/// A (key, language) pair that could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTranslation {
    pub key: String,
    pub language: String,
    pub error: String,
}

/// Result of a batch: wire key → language → text, plus the failed pairs.
///
/// Failed pairs are present in `translations` with a sentinel value so the
/// map always has an entry for every requested pair. `sources` holds the text
/// each key was translated from; merges use it to drop results for content
/// that changed while the batch was in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationBatch {
    pub translations: BTreeMap<String, TranslationMap>,
    #[serde(default)]
    pub failures: Vec<FailedTranslation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,
}

/// A merged registry plus the wire keys whose result was dropped because the
/// record's content no longer matches the text that was translated.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTranslations {
    pub registry: ComponentRegistry,
    pub outdated: Vec<String>,
}

impl TranslationBatch {
    /// `true` when at least one pair failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Distinct languages with at least one failed pair.
    pub fn failed_languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.failures.iter().map(|f| f.language.clone()).collect();
        langs.sort();
        langs.dedup();
        langs
    }

    /// `true` when `key` was translated from text other than `current`.
    /// Keys without a recorded source are taken as current.
    pub fn is_outdated(&self, key: &str, current: &str) -> bool {
        self.sources.get(key).is_some_and(|source| source != current)
    }
}

/// Placeholder stored in place of a failed translation.
pub fn failure_sentinel(error: &str) -> String {
    format!("{TRANSLATION_FAILED_PREFIX} {error}]")
}

/// `true` if `text` is a failure placeholder rather than a translation.
pub fn is_failure_sentinel(text: &str) -> bool {
    text.starts_with(TRANSLATION_FAILED_PREFIX)
}

/// Validate a batch's target languages: at least one is required.
pub fn validate_target_languages(languages: &[String]) -> Result<(), CoreError> {
    if languages.iter().all(|l| l.trim().is_empty()) {
        return Err(CoreError::Validation(
            "Select at least one target language to translate".to_string(),
        ));
    }
    Ok(())
}

/// Texts for a whole-document pass: every record that has a slot in the
/// structure and non-empty generated content, in reading order. Orphaned
/// records are not translated.
pub fn document_texts(
    registry: &ComponentRegistry,
    sections: &[StructureSection],
) -> Vec<TranslationText> {
    slots(sections)
        .into_iter()
        .filter(|s| s.component_type.is_generated())
        .filter_map(|s| {
            let record = registry.get(s.component_type, s.display_index)?;
            if record.generated_content.trim().is_empty() {
                return None;
            }
            Some(TranslationText {
                key: s.wire_key,
                content: record.generated_content.clone(),
            })
        })
        .collect()
}

/// Text for a single-component pass.
pub fn component_text(
    registry: &ComponentRegistry,
    component_type: ComponentType,
    index: u32,
) -> Result<TranslationText, CoreError> {
    let record = registry.require(component_type, index)?;
    Ok(TranslationText {
        key: format_wire_key(component_type, index),
        content: record.generated_content.clone(),
    })
}

/// Intersect a returned language map with the current target set.
///
/// A failed pair keeps the record's previous translation for that language
/// when there is one and is left out otherwise, so failure placeholders never
/// reach stored content.
fn restrict(
    map: &TranslationMap,
    previous: Option<&TranslationMap>,
    languages: &TargetLanguageSet,
) -> TranslationMap {
    map.iter()
        .filter(|(lang, _)| languages.contains(lang))
        .filter_map(|(lang, text)| {
            if is_failure_sentinel(text) {
                let kept = previous?.get(lang)?;
                Some((lang.clone(), kept.clone()))
            } else {
                Some((lang.clone(), text.clone()))
            }
        })
        .collect()
}

/// Merge a whole-document batch.
///
/// Every record whose wire key appears in the batch has its map replaced by
/// the returned map restricted to `languages`. Afterwards every record in the
/// registry is pruned to `languages`, so no stale language survives the pass.
/// Keys in the batch that do not parse or have no record are ignored. A key
/// whose record was edited after the batch was built keeps its current
/// translations and is listed in [`MergedTranslations::outdated`].
pub fn merge_document(
    registry: &ComponentRegistry,
    batch: &TranslationBatch,
    languages: &TargetLanguageSet,
) -> MergedTranslations {
    let mut next = registry.prune_languages(languages);
    let mut outdated = Vec::new();

    for (key, map) in &batch.translations {
        match WireKey::parse(key) {
            WireKey::Parsed {
                component_type,
                index,
            } => {
                let Some(record) = registry.get(component_type, index) else {
                    tracing::warn!(key = %key, "Translation returned for a missing component");
                    continue;
                };
                if batch.is_outdated(key, &record.generated_content) {
                    tracing::info!(key = %key, "Content changed during translation, keeping current translations");
                    outdated.push(key.clone());
                    continue;
                }
                let fresh = restrict(map, Some(&record.translations), languages);
                if let Ok(merged) = next.replace_translations(component_type, index, &fresh) {
                    next = merged;
                }
            }
            WireKey::Unparsable(raw) => {
                tracing::warn!(key = %raw, "Dropping translation with unparsable key");
            }
        }
    }

    MergedTranslations {
        registry: next,
        outdated,
    }
}

/// Merge a single-component batch into exactly one record.
///
/// If the record was edited after the batch was built the registry is
/// returned unchanged and the key is reported as outdated.
pub fn merge_component(
    registry: &ComponentRegistry,
    component_type: ComponentType,
    index: u32,
    batch: &TranslationBatch,
    languages: &TargetLanguageSet,
) -> Result<MergedTranslations, CoreError> {
    let record = registry.require(component_type, index)?;
    let key = format_wire_key(component_type, index);
    if batch.is_outdated(&key, &record.generated_content) {
        return Ok(MergedTranslations {
            registry: registry.clone(),
            outdated: vec![key],
        });
    }
    let map = batch.translations.get(&key).cloned().unwrap_or_default();
    let registry = registry.replace_translations(
        component_type,
        index,
        &restrict(&map, Some(&record.translations), languages),
    )?;
    Ok(MergedTranslations {
        registry,
        outdated: Vec::new(),
    })
}
