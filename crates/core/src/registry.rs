//! Component registry: generated content and translations keyed by
//! `(component_type, display_index)`.
//!
//! The registry is an immutable value. Every write returns a new registry so
//! readers holding an older snapshot never observe a partial update.
//!
//! Display indices are recomputed from the structure on every call to
//! [`resolve`] / [`slots`]. Inserting or removing a component shifts the
//! indices of every later component of the same type, so nothing here is
//! cached across structural edits.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::component::ComponentType;
use crate::error::CoreError;
use crate::language::{normalize_language_code, TargetLanguageSet};
use crate::structure::StructureSection;
use crate::types::DbId;
use crate::wire_key::format_wire_key;

/// Language code → translated text.
pub type TranslationMap = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Generated content for one component slot plus its translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub component_type: ComponentType,
    /// Display index of the slot. A missing index means 1.
    #[serde(default)]
    pub component_index: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_content")]
    pub generated_content: String,
    /// Public URL of the media for image slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<DbId>,
    #[serde(default, deserialize_with = "deserialize_translations")]
    pub translations: TranslationMap,
}

impl ComponentRecord {
    pub fn new(component_type: ComponentType, index: u32, content: &str) -> Self {
        Self {
            component_type,
            component_index: Some(index),
            generated_content: apply_type_normalization(component_type, content),
            component_url: None,
            image_id: None,
            translations: TranslationMap::new(),
        }
    }

    /// Effective display index (`None` ⇒ 1).
    pub fn index(&self) -> u32 {
        self.component_index.unwrap_or(1)
    }

    pub fn wire_key(&self) -> String {
        format_wire_key(self.component_type, self.index())
    }

    fn matches(&self, component_type: ComponentType, index: u32) -> bool {
        self.component_type == component_type && self.index() == index
    }
}

fn deserialize_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept translations either as a `{lang: text}` object or as the store's
/// row list `[{language_code, translated_content}]`. Codes are lowercased.
fn deserialize_translations<'de, D>(deserializer: D) -> Result<TranslationMap, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| translations_from_value(&v)).unwrap_or_default())
}

fn translations_from_value(value: &serde_json::Value) -> TranslationMap {
    use serde_json::Value;

    let mut out = TranslationMap::new();
    match value {
        Value::Object(map) => {
            for (lang, v) in map {
                let text = match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(row) => row
                        .get("translated_content")
                        .or_else(|| row.get("content"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                };
                if let Some(text) = text {
                    out.insert(normalize_language_code(lang), text);
                }
            }
        }
        Value::Array(rows) => {
            for row in rows {
                let lang = row
                    .get("language_code")
                    .or_else(|| row.get("lang"))
                    .and_then(Value::as_str);
                let text = row
                    .get("translated_content")
                    .or_else(|| row.get("content"))
                    .and_then(Value::as_str);
                if let (Some(lang), Some(text)) = (lang, text) {
                    out.insert(normalize_language_code(lang), text.to_string());
                }
            }
        }
        _ => {}
    }
    out
}

/// Per-type normalization applied on every write path: CTA copy is always
/// upper-case, everything else is stored verbatim.
pub fn apply_type_normalization(component_type: ComponentType, text: &str) -> String {
    match component_type {
        ComponentType::Cta => text.to_uppercase(),
        _ => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The authoritative collection of component records for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRegistry {
    records: Vec<ComponentRecord>,
}

impl ComponentRegistry {
    /// Build a registry from stored records. Later duplicates of the same
    /// `(type, index)` replace earlier ones; CTA content is re-normalized.
    pub fn from_records(records: Vec<ComponentRecord>) -> Self {
        let mut out: Vec<ComponentRecord> = Vec::with_capacity(records.len());
        for mut record in records {
            record.generated_content =
                apply_type_normalization(record.component_type, &record.generated_content);
            for text in record.translations.values_mut() {
                *text = apply_type_normalization(record.component_type, text);
            }
            match out
                .iter()
                .position(|r| r.matches(record.component_type, record.index()))
            {
                Some(pos) => out[pos] = record,
                None => out.push(record),
            }
        }
        Self { records: out }
    }

    pub fn records(&self) -> &[ComponentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact lookup. `None` is the normal state of a not-yet-generated slot.
    pub fn get(&self, component_type: ComponentType, index: u32) -> Option<&ComponentRecord> {
        self.records.iter().find(|r| r.matches(component_type, index))
    }

    /// Lookup that treats a missing record as an error.
    pub fn require(
        &self,
        component_type: ComponentType,
        index: u32,
    ) -> Result<&ComponentRecord, CoreError> {
        self.get(component_type, index)
            .ok_or(CoreError::NotFound {
                component_type,
                index,
            })
    }

    /// Replace the generated content of `(type, index)`, or create the
    /// record with empty translations. Translations of an existing record
    /// are kept as they are.
    pub fn upsert(&self, component_type: ComponentType, index: u32, content: &str) -> Self {
        let mut records = self.records.clone();
        let content = apply_type_normalization(component_type, content);
        match records.iter_mut().find(|r| r.matches(component_type, index)) {
            Some(record) => record.generated_content = content,
            None => records.push(ComponentRecord::new(component_type, index, &content)),
        }
        Self { records }
    }

    /// Replace the whole translation map of one record. CTA values are
    /// upper-cased and language codes lowercased.
    pub fn replace_translations(
        &self,
        component_type: ComponentType,
        index: u32,
        translations: &TranslationMap,
    ) -> Result<Self, CoreError> {
        let mut records = self.records.clone();
        let record = records
            .iter_mut()
            .find(|r| r.matches(component_type, index))
            .ok_or(CoreError::NotFound {
                component_type,
                index,
            })?;
        record.translations = translations
            .iter()
            .map(|(lang, text)| {
                (
                    normalize_language_code(lang),
                    apply_type_normalization(component_type, text),
                )
            })
            .collect();
        Ok(Self { records })
    }

    /// Drop every translation whose language is not in `languages`.
    pub fn prune_languages(&self, languages: &TargetLanguageSet) -> Self {
        let records = self
            .records
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.translations.retain(|lang, _| languages.contains(lang));
                r
            })
            .collect();
        Self { records }
    }

    /// Set the media URL of an image slot, creating the record if needed.
    pub fn attach_media(&self, index: u32, url: &str, image_id: Option<DbId>) -> Self {
        let mut next = self.upsert(ComponentType::Image, index, "");
        if let Some(record) = next
            .records
            .iter_mut()
            .find(|r| r.matches(ComponentType::Image, index))
        {
            record.component_url = Some(url.to_string());
            record.image_id = image_id;
        }
        next
    }

    /// Records whose `(type, index)` has no slot in `sections`.
    ///
    /// Removing a slot never deletes its record; the record stays in the
    /// registry (and in saved state) and reappears if the same slot is
    /// recreated.
    pub fn orphans(&self, sections: &[StructureSection]) -> Vec<&ComponentRecord> {
        let live: HashSet<(ComponentType, u32)> = slots(sections)
            .into_iter()
            .map(|s| (s.component_type, s.display_index))
            .collect();
        self.records
            .iter()
            .filter(|r| !live.contains(&(r.component_type, r.index())))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Slot resolution
// ---------------------------------------------------------------------------

/// A logical slot of the document in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub component_type: ComponentType,
    pub display_index: u32,
    /// `None` for the header slots.
    pub section_key: Option<String>,
    /// Position inside the section; `None` for the header slots.
    pub position: Option<usize>,
    pub wire_key: String,
}

/// Every slot of the document in reading order: subject, pre_header, then
/// each section's components. Display indices count per type across all
/// sections.
pub fn slots(sections: &[StructureSection]) -> Vec<Slot> {
    let mut counters: HashMap<ComponentType, u32> = HashMap::new();
    let mut out = Vec::new();

    for component_type in ComponentType::HEADERS {
        out.push(Slot {
            component_type,
            display_index: 1,
            section_key: None,
            position: None,
            wire_key: format_wire_key(component_type, 1),
        });
    }

    for section in sections {
        for (position, &component_type) in section.components.iter().enumerate() {
            let counter = counters.entry(component_type).or_insert(0);
            *counter += 1;
            out.push(Slot {
                component_type,
                display_index: *counter,
                section_key: Some(section.key.clone()),
                position: Some(position),
                wire_key: format_wire_key(component_type, *counter),
            });
        }
    }

    out
}

/// Display index of the component at `position` in section `section_key`.
///
/// Returns `None` when the slot does not exist or holds a different type.
/// Header types always resolve to 1 regardless of the other arguments.
pub fn resolve(
    sections: &[StructureSection],
    component_type: ComponentType,
    section_key: &str,
    position: usize,
) -> Option<u32> {
    if component_type.is_header() {
        return Some(1);
    }

    let mut count = 0;
    for section in sections {
        for (pos, &t) in section.components.iter().enumerate() {
            if t != component_type {
                continue;
            }
            count += 1;
            if section.key == section_key && pos == position {
                return Some(count);
            }
        }
    }
    None
}
