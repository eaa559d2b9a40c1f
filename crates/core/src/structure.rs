//! Email structure model: ordered sections of free-instance components.
//!
//! The header slots (`subject`, `pre_header`) are implicit and never stored
//! in a section. Reading order is subject, pre_header, then every section in
//! order with its components in order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::ComponentType;
use crate::error::CoreError;

/// Key of the section synthesized from legacy flat structures.
pub const LEGACY_SECTION_KEY: &str = "main";
/// Display name of the section synthesized from legacy flat structures.
pub const LEGACY_SECTION_NAME: &str = "Main Section";
/// Maximum length of a section display name.
pub const MAX_SECTION_NAME_LENGTH: usize = 100;
/// Maximum number of components in one section.
pub const MAX_SECTION_COMPONENTS: usize = 50;

/// A user-defined, ordered grouping of components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSection {
    /// Assigned once at creation, never derived from position.
    pub key: String,
    pub name: String,
    pub components: Vec<ComponentType>,
}

impl StructureSection {
    /// Create an empty section with a freshly minted key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: format!("section_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            components: Vec::new(),
        }
    }
}

/// Flattened `{component, count}` entry, as sent to the generator and as
/// stored by legacy projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEntry {
    pub component: ComponentType,
    pub count: u32,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a raw stored structure into the section model.
///
/// Accepts either the section shape (`[{key, name, components}]`) or the
/// legacy flat shape (`[{component, count}]`). Legacy input becomes a single
/// `Main Section`; header types are hoisted out in both shapes. Unknown
/// component names are dropped. Normalizing already-normalized input returns
/// it unchanged.
pub fn normalize(raw: &Value) -> Vec<StructureSection> {
    let items: &[Value] = raw.as_array().map(Vec::as_slice).unwrap_or_default();

    let is_section_shape = items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|obj| obj.contains_key("components"));

    if is_section_shape {
        normalize_sections(items)
    } else {
        vec![normalize_legacy(items)]
    }
}

fn normalize_sections(items: &[Value]) -> Vec<StructureSection> {
    let mut seen_keys = HashSet::new();
    let mut sections = Vec::with_capacity(items.len());

    for (position, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            tracing::warn!(position, "Dropping non-object structure section");
            continue;
        };

        let base_key = obj
            .get("key")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("section_{}", position + 1));
        let key = unique_key(base_key, &mut seen_keys);

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Section {}", position + 1));

        let components = obj
            .get("components")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|c| parse_free_component(c.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        sections.push(StructureSection {
            key,
            name,
            components,
        });
    }

    sections
}

fn normalize_legacy(items: &[Value]) -> StructureSection {
    let mut components = Vec::new();

    for item in items {
        let Some(name) = item.get("component").and_then(Value::as_str) else {
            continue;
        };
        let Some(component) = parse_free_component(name) else {
            continue;
        };
        // Missing, zero or negative counts mean a single instance.
        let count = item
            .get("count")
            .and_then(Value::as_i64)
            .filter(|&c| c > 0)
            .unwrap_or(1);
        let room = MAX_SECTION_COMPONENTS.saturating_sub(components.len());
        let wanted = usize::try_from(count).unwrap_or(usize::MAX);
        if wanted > room {
            tracing::warn!(component = name, count, kept = room, "Clamping legacy component count");
        }
        components.extend(std::iter::repeat_n(component, wanted.min(room)));
    }

    StructureSection {
        key: LEGACY_SECTION_KEY.to_string(),
        name: LEGACY_SECTION_NAME.to_string(),
        components,
    }
}

/// Parse a component name that may live in a section. Header types and
/// unknown names yield `None`.
fn parse_free_component(name: &str) -> Option<ComponentType> {
    match name.parse::<ComponentType>() {
        Ok(t) if t.is_header() => None,
        Ok(t) => Some(t),
        Err(_) => {
            tracing::warn!(component = name, "Dropping unknown structure component");
            None
        }
    }
}

fn unique_key(base: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Generation view
// ---------------------------------------------------------------------------

/// Count the instances of `component_type` across every section.
pub fn count_of(sections: &[StructureSection], component_type: ComponentType) -> u32 {
    sections
        .iter()
        .flat_map(|s| s.components.iter())
        .filter(|&&c| c == component_type)
        .count() as u32
}

/// Aggregate the section model into the flat structure the generator expects.
///
/// Always starts with `subject: 1` and `pre_header: 1`, followed by the
/// generated free-instance types that occur at least once. Image slots carry
/// uploaded media and are not requested from the generator.
pub fn to_generation_structure(sections: &[StructureSection]) -> Vec<StructureEntry> {
    let mut entries: Vec<StructureEntry> = ComponentType::HEADERS
        .into_iter()
        .map(|component| StructureEntry {
            component,
            count: 1,
        })
        .collect();

    for component in ComponentType::GENERATED_FREE {
        let count = count_of(sections, component);
        if count > 0 {
            entries.push(StructureEntry { component, count });
        }
    }

    entries
}

/// Build a default section from flat generation counts. Used when a document
/// had no free-instance components before its first generation.
pub fn section_from_entries(entries: &[StructureEntry]) -> StructureSection {
    let components = entries
        .iter()
        .filter(|e| !e.component.is_header())
        .flat_map(|e| std::iter::repeat_n(e.component, e.count as usize))
        .take(MAX_SECTION_COMPONENTS)
        .collect();

    StructureSection {
        key: LEGACY_SECTION_KEY.to_string(),
        name: LEGACY_SECTION_NAME.to_string(),
        components,
    }
}

// ---------------------------------------------------------------------------
// Structural edits
// ---------------------------------------------------------------------------

/// Validate a section display name.
pub fn validate_section_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Section name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_SECTION_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Section name exceeds maximum length of {MAX_SECTION_NAME_LENGTH} characters (got {})",
            name.len()
        )));
    }
    Ok(())
}

fn ensure_free(component_type: ComponentType) -> Result<(), CoreError> {
    if component_type.is_header() {
        return Err(CoreError::Validation(format!(
            "'{component_type}' is a header slot and cannot be placed in a section"
        )));
    }
    Ok(())
}

/// Validate a client-supplied section list: non-blank unique keys, valid
/// names, no header types inside sections and at most
/// [`MAX_SECTION_COMPONENTS`] components per section.
pub fn validate_sections(sections: &[StructureSection]) -> Result<(), CoreError> {
    let mut keys = HashSet::new();
    for section in sections {
        if section.key.trim().is_empty() {
            return Err(CoreError::Validation("Section key must not be empty".to_string()));
        }
        if !keys.insert(section.key.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate section key '{}'",
                section.key
            )));
        }
        validate_section_name(&section.name)?;
        if section.components.len() > MAX_SECTION_COMPONENTS {
            return Err(CoreError::Validation(format!(
                "Section '{}' has more than {MAX_SECTION_COMPONENTS} components",
                section.key
            )));
        }
        for &component in &section.components {
            ensure_free(component)?;
        }
    }
    Ok(())
}

fn section_position(sections: &[StructureSection], key: &str) -> Result<usize, CoreError> {
    sections
        .iter()
        .position(|s| s.key == key)
        .ok_or_else(|| CoreError::Validation(format!("Unknown section '{key}'")))
}

/// Append a new, empty section. Returns the new structure and the new key.
pub fn add_section(
    sections: &[StructureSection],
    name: &str,
) -> Result<(Vec<StructureSection>, String), CoreError> {
    validate_section_name(name)?;
    let section = StructureSection::new(name.trim());
    let key = section.key.clone();
    let mut next = sections.to_vec();
    next.push(section);
    Ok((next, key))
}

pub fn rename_section(
    sections: &[StructureSection],
    key: &str,
    name: &str,
) -> Result<Vec<StructureSection>, CoreError> {
    validate_section_name(name)?;
    let idx = section_position(sections, key)?;
    let mut next = sections.to_vec();
    next[idx].name = name.trim().to_string();
    Ok(next)
}

pub fn remove_section(
    sections: &[StructureSection],
    key: &str,
) -> Result<Vec<StructureSection>, CoreError> {
    let idx = section_position(sections, key)?;
    let mut next = sections.to_vec();
    next.remove(idx);
    Ok(next)
}

/// Move a whole section to `to` (clamped to the end of the list).
pub fn move_section(
    sections: &[StructureSection],
    key: &str,
    to: usize,
) -> Result<Vec<StructureSection>, CoreError> {
    let idx = section_position(sections, key)?;
    let mut next = sections.to_vec();
    let section = next.remove(idx);
    let to = to.min(next.len());
    next.insert(to, section);
    Ok(next)
}

/// Insert a component into a section at `position` (appends when `None` or
/// past the end).
pub fn add_component(
    sections: &[StructureSection],
    key: &str,
    component_type: ComponentType,
    position: Option<usize>,
) -> Result<Vec<StructureSection>, CoreError> {
    ensure_free(component_type)?;
    let idx = section_position(sections, key)?;
    let mut next = sections.to_vec();
    let components = &mut next[idx].components;
    let at = position.unwrap_or(components.len()).min(components.len());
    components.insert(at, component_type);
    Ok(next)
}

pub fn remove_component(
    sections: &[StructureSection],
    key: &str,
    position: usize,
) -> Result<Vec<StructureSection>, CoreError> {
    let idx = section_position(sections, key)?;
    if position >= sections[idx].components.len() {
        return Err(CoreError::Validation(format!(
            "Section '{key}' has no component at position {position}"
        )));
    }
    let mut next = sections.to_vec();
    next[idx].components.remove(position);
    Ok(next)
}

/// Move a component between (or within) sections. The target position is
/// interpreted after the component has been removed from its source.
pub fn move_component(
    sections: &[StructureSection],
    from_key: &str,
    from_position: usize,
    to_key: &str,
    to_position: usize,
) -> Result<Vec<StructureSection>, CoreError> {
    let from_idx = section_position(sections, from_key)?;
    let to_idx = section_position(sections, to_key)?;
    if from_position >= sections[from_idx].components.len() {
        return Err(CoreError::Validation(format!(
            "Section '{from_key}' has no component at position {from_position}"
        )));
    }
    let mut next = sections.to_vec();
    let component = next[from_idx].components.remove(from_position);
    let target = &mut next[to_idx].components;
    let at = to_position.min(target.len());
    target.insert(at, component);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use ComponentType::{Body, Cta, Image, Title};

    fn section(key: &str, components: &[ComponentType]) -> StructureSection {
        StructureSection {
            key: key.to_string(),
            name: key.to_uppercase(),
            components: components.to_vec(),
        }
    }

    // -- Normalization --

    #[test]
    fn legacy_structure_becomes_main_section() {
        let raw = json!([
            {"component": "title", "count": 1},
            {"component": "cta", "count": 2}
        ]);
        let sections = normalize(&raw);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].key, LEGACY_SECTION_KEY);
        assert_eq!(sections[0].name, LEGACY_SECTION_NAME);
        assert_eq!(sections[0].components, vec![Title, Cta, Cta]);
    }

    #[test]
    fn legacy_headers_are_hoisted_out() {
        let raw = json!([
            {"component": "subject", "count": 1},
            {"component": "pre_header", "count": 1},
            {"component": "body", "count": 2}
        ]);
        let sections = normalize(&raw);
        assert_eq!(sections[0].components, vec![Body, Body]);
    }

    #[test]
    fn legacy_missing_or_zero_count_means_one() {
        let raw = json!([{"component": "body"}, {"component": "cta", "count": 0}]);
        assert_eq!(normalize(&raw)[0].components, vec![Body, Cta]);
    }

    #[test]
    fn legacy_count_is_clamped_to_section_limit() {
        let raw = json!([
            {"component": "title"},
            {"component": "body", "count": 9000000000000000000i64},
            {"component": "cta", "count": 3}
        ]);
        let components = &normalize(&raw)[0].components;
        assert_eq!(components.len(), MAX_SECTION_COMPONENTS);
        assert_eq!(components[0], Title);
        assert!(components[1..].iter().all(|&c| c == Body));
    }

    #[test]
    fn oversized_section_is_rejected() {
        let mut big = section("big", &[Body]);
        big.components = vec![Body; MAX_SECTION_COMPONENTS + 1];
        assert!(validate_sections(&[big]).is_err());
    }

    #[test]
    fn section_shape_passes_through() {
        let raw = json!([
            {"key": "hero", "name": "Hero", "components": ["image", "title", "cta"]},
            {"key": "s2", "name": "Details", "components": ["body"]}
        ]);
        let sections = normalize(&raw);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].key, "hero");
        assert_eq!(sections[0].components, vec![Image, Title, Cta]);
        assert_eq!(sections[1].components, vec![Body]);
    }

    #[test]
    fn section_shape_drops_headers_and_unknown_types() {
        let raw = json!([
            {"key": "a", "name": "A", "components": ["subject", "title", "footer"]}
        ]);
        assert_eq!(normalize(&raw)[0].components, vec![Title]);
    }

    #[test]
    fn duplicate_section_keys_are_made_unique() {
        let raw = json!([
            {"key": "a", "name": "A", "components": []},
            {"key": "a", "name": "B", "components": []}
        ]);
        let sections = normalize(&raw);
        assert_eq!(sections[0].key, "a");
        assert_eq!(sections[1].key, "a_2");
    }

    #[test]
    fn empty_or_invalid_input_yields_empty_main_section() {
        for raw in [json!([]), json!(null), json!({"x": 1})] {
            let sections = normalize(&raw);
            assert_eq!(sections.len(), 1);
            assert_eq!(sections[0].key, LEGACY_SECTION_KEY);
            assert!(sections[0].components.is_empty());
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            json!([{"component": "title", "count": 1}, {"component": "cta", "count": 2}]),
            json!([{"key": "a", "name": "A", "components": ["body", "subject", "nope"]},
                   {"key": "a", "components": ["cta"]}]),
            json!([]),
            json!("garbage"),
        ];
        for raw in inputs {
            let once = normalize(&raw);
            let twice = normalize(&serde_json::to_value(&once).unwrap());
            assert_eq!(once, twice);
        }
    }

    // -- Generation view --

    #[test]
    fn generation_structure_always_has_headers() {
        let entries = to_generation_structure(&[]);
        assert_eq!(
            entries,
            vec![
                StructureEntry { component: ComponentType::Subject, count: 1 },
                StructureEntry { component: ComponentType::PreHeader, count: 1 },
            ]
        );
    }

    #[test]
    fn generation_structure_counts_across_sections() {
        let sections = vec![
            section("a", &[Title, Body, Image]),
            section("b", &[Body, Cta]),
        ];
        let entries = to_generation_structure(&sections);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[2], StructureEntry { component: Title, count: 1 });
        assert_eq!(entries[3], StructureEntry { component: Body, count: 2 });
        assert_eq!(entries[4], StructureEntry { component: Cta, count: 1 });
    }

    #[test]
    fn section_from_entries_explodes_counts() {
        let entries = to_generation_structure(&[section("x", &[Body, Cta, Body])]);
        let s = section_from_entries(&entries);
        assert_eq!(s.components, vec![Body, Body, Cta]);
    }

    // -- Edits --

    #[test]
    fn add_section_mints_unique_keys() {
        let (one, k1) = add_section(&[], "Hero").unwrap();
        let (two, k2) = add_section(&one, "Footer").unwrap();
        assert_ne!(k1, k2);
        assert_eq!(two.len(), 2);
        assert!(k1.starts_with("section_"));
    }

    #[test]
    fn add_section_rejects_blank_name() {
        assert!(add_section(&[], "  ").is_err());
    }

    #[test]
    fn add_component_refuses_headers() {
        let sections = vec![section("a", &[])];
        assert!(add_component(&sections, "a", ComponentType::Subject, None).is_err());
        let next = add_component(&sections, "a", Cta, None).unwrap();
        assert_eq!(next[0].components, vec![Cta]);
    }

    #[test]
    fn move_component_across_sections_keeps_keys() {
        let sections = vec![section("a", &[Title, Body]), section("b", &[Cta])];
        let next = move_component(&sections, "a", 1, "b", 0).unwrap();
        assert_eq!(next[0].components, vec![Title]);
        assert_eq!(next[1].components, vec![Body, Cta]);
        assert_eq!(next[0].key, "a");
        assert_eq!(next[1].key, "b");
    }

    #[test]
    fn move_section_reorders_without_rekeying() {
        let sections = vec![section("a", &[]), section("b", &[]), section("c", &[])];
        let next = move_section(&sections, "c", 0).unwrap();
        let keys: Vec<_> = next.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn remove_component_out_of_range_is_rejected() {
        let sections = vec![section("a", &[Body])];
        assert!(remove_component(&sections, "a", 3).is_err());
        assert!(remove_component(&sections, "missing", 0).is_err());
        assert!(remove_component(&sections, "a", 0).unwrap()[0].components.is_empty());
    }
}
