//! Single-component regeneration policy.
//!
//! Regenerating one slot asks the generator for several candidates with a
//! prompt that embeds the whole document for coherence and names the current
//! copy as forbidden. The first candidate that differs from the current copy
//! after normalization wins; if none differs the regeneration fails and the
//! slot is left as it was.

use serde::Serialize;

use crate::component::ComponentType;
use crate::error::CoreError;
use crate::generation::{
    GenerationRequest, Variation, CONTENT_TYPE_NEWSLETTER,
};
use crate::registry::{slots, ComponentRegistry};
use crate::structure::{StructureEntry, StructureSection};
use crate::wire_key::WireKey;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of candidates requested per regeneration.
pub const REGENERATION_CANDIDATES: u32 = 3;

/// Content shorter than this (in characters) is treated as CTA-class copy and
/// gets the aggressive anti-repetition treatment.
pub const SHORT_CONTENT_THRESHOLD: usize = 30;

/// Temperature added on top of the document temperature for every
/// regeneration.
pub const REGENERATION_TEMPERATURE_BOOST: f64 = 0.2;

/// Additional boost for short content.
pub const SHORT_CONTENT_TEMPERATURE_BOOST: f64 = 0.1;

/// Upper bound for any regeneration temperature.
pub const MAX_TEMPERATURE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Normalization and candidate selection
// ---------------------------------------------------------------------------

/// Comparison form of a text: lowercase, punctuation removed, whitespace
/// collapsed to single spaces and trimmed.
pub fn normalize_for_comparison(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `true` for CTA-class content that needs stronger anti-repetition.
pub fn is_short_content(text: &str) -> bool {
    text.chars().count() < SHORT_CONTENT_THRESHOLD
}

/// Temperature for a regeneration of `current` starting from the document
/// temperature `base`.
pub fn regeneration_temperature(base: f64, current: &str) -> f64 {
    let mut t = base + REGENERATION_TEMPERATURE_BOOST;
    if is_short_content(current) {
        t += SHORT_CONTENT_TEMPERATURE_BOOST;
    }
    t.min(MAX_TEMPERATURE)
}

/// Pick the first candidate whose normalized form differs from the
/// normalized current content.
pub fn pick_distinct_candidate<'a, I>(current: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let current = normalize_for_comparison(current);
    candidates
        .into_iter()
        .find(|c| !c.trim().is_empty() && normalize_for_comparison(c) != current)
}

/// Extract the text for `component_type` from one returned variation.
///
/// Looks for any key that parses to the requested type; a variation holding a
/// single value is accepted as-is whatever its key.
pub fn candidate_from_variation(
    variation: &Variation,
    component_type: ComponentType,
) -> Option<&str> {
    let matching = variation.iter().find_map(|(key, text)| match WireKey::parse(key) {
        WireKey::Parsed {
            component_type: t, ..
        } if t == component_type => Some(text.as_str()),
        _ => None,
    });
    matching.or_else(|| {
        if variation.len() == 1 {
            variation.values().next().map(String::as_str)
        } else {
            None
        }
    })
}

// ---------------------------------------------------------------------------
// Prompt construction
// ---------------------------------------------------------------------------

/// One labelled component of the current document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextLine {
    pub label: String,
    pub content: String,
}

/// Label shown to the model for a slot, e.g. `Subject`, `Body 2`.
pub fn slot_label(component_type: ComponentType, index: u32) -> String {
    if component_type.is_header() {
        component_type.label().to_string()
    } else {
        format!("{} {index}", component_type.label())
    }
}

/// Every generated slot of the document that currently has content, in
/// reading order.
pub fn document_context(
    registry: &ComponentRegistry,
    sections: &[StructureSection],
) -> Vec<ContextLine> {
    slots(sections)
        .into_iter()
        .filter(|s| s.component_type.is_generated())
        .filter_map(|s| {
            let record = registry.get(s.component_type, s.display_index)?;
            if record.generated_content.trim().is_empty() {
                return None;
            }
            Some(ContextLine {
                label: slot_label(s.component_type, s.display_index),
                content: record.generated_content.clone(),
            })
        })
        .collect()
}

/// Everything needed to regenerate one slot.
#[derive(Debug, Clone)]
pub struct RegenerationContext<'a> {
    pub brief: &'a str,
    pub tone: &'a str,
    pub component_type: ComponentType,
    pub index: u32,
    pub current: &'a str,
    pub document: &'a [ContextLine],
    pub base_temperature: f64,
}

/// Build the augmented prompt for a single-slot regeneration.
pub fn build_regeneration_prompt(ctx: &RegenerationContext<'_>) -> String {
    let target = slot_label(ctx.component_type, ctx.index);

    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Rewrite the {target} of this email. Keep a {} tone and stay coherent with the rest of the email.\n\n",
        ctx.tone
    ));
    prompt.push_str(&format!("Creative brief:\n{}\n\n", ctx.brief.trim()));

    if !ctx.document.is_empty() {
        prompt.push_str("Current email:\n");
        for line in ctx.document {
            prompt.push_str(&format!("- {}: {}\n", line.label, line.content));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "FORBIDDEN (do not repeat or lightly rephrase): \"{}\"\n",
        ctx.current
    ));
    prompt.push_str(&format!(
        "Write a clearly different {target} with new wording and a new angle.\n"
    ));

    if is_short_content(ctx.current) {
        prompt.push_str(
            "This is short copy. Do not reuse any of its words. Change the verb and the structure. \
             Do not only change letter case or punctuation.\n",
        );
    }

    prompt
}

/// Build the generation request for a single-slot regeneration.
pub fn build_regeneration_request(
    ctx: &RegenerationContext<'_>,
) -> Result<GenerationRequest, CoreError> {
    if ctx.brief.trim().is_empty() {
        return Err(CoreError::Validation(
            "Please enter a creative brief first".to_string(),
        ));
    }
    if !ctx.component_type.is_generated() {
        return Err(CoreError::Validation(format!(
            "'{}' components are not generated",
            ctx.component_type
        )));
    }

    Ok(GenerationRequest {
        text: build_regeneration_prompt(ctx),
        count: REGENERATION_CANDIDATES,
        tone: ctx.tone.to_string(),
        content_type: CONTENT_TYPE_NEWSLETTER.to_string(),
        structure: vec![StructureEntry {
            component: ctx.component_type,
            count: 1,
        }],
        context: None,
        image_url: None,
        temperature: regeneration_temperature(ctx.base_temperature, ctx.current),
        use_flash: false,
        use_few_shot: false,
    })
}
