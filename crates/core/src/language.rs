//! Target language catalogue and the project's target language set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Source language of all generated copy. Never a translation target.
pub const SOURCE_LANGUAGE: &str = "en";

/// Languages content can be translated into, with display names.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("it", "Italian"),
    ("de", "German"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ar", "Arabic"),
    ("nl", "Dutch"),
];

/// Display name for a supported language code.
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Lowercase and trim a language code.
pub fn normalize_language_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Validate that a (normalized) code is a supported translation target.
pub fn validate_language(code: &str) -> Result<(), CoreError> {
    if language_name(code).is_some() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported target language '{code}'. Must be one of: {}",
            SUPPORTED_LANGUAGES
                .iter()
                .map(|(c, _)| *c)
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

/// Unordered set of lowercase language codes attached to a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetLanguageSet(BTreeSet<String>);

impl TargetLanguageSet {
    /// Build a set from stored codes without validation. Codes are
    /// normalized; blanks are dropped. Used when loading persisted projects,
    /// which may carry codes outside the current catalogue.
    pub fn from_stored<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            codes
                .into_iter()
                .map(|c| normalize_language_code(c.as_ref()))
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    /// Build a set from user input, rejecting unsupported codes and the
    /// source language.
    pub fn parse<I, S>(codes: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = Self::from_stored(codes);
        for code in &set.0 {
            validate_language(code)?;
        }
        Ok(set)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(&normalize_language_code(code))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}
