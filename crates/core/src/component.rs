//! Email component types.
//!
//! Two kinds of slots exist: the singleton header slots (`subject`,
//! `pre_header`) that every email has exactly once and that live outside the
//! section list, and the free-instance types that users place inside sections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One content-bearing slot kind in an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Subject,
    PreHeader,
    Title,
    Body,
    Cta,
    Image,
}

impl ComponentType {
    /// Every type, in canonical reading order of the header slots followed by
    /// the free-instance types.
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Subject,
        ComponentType::PreHeader,
        ComponentType::Title,
        ComponentType::Body,
        ComponentType::Cta,
        ComponentType::Image,
    ];

    /// Header slots, in the order they appear at the top of every email.
    pub const HEADERS: [ComponentType; 2] = [ComponentType::Subject, ComponentType::PreHeader];

    /// Free-instance types whose copy is produced by the generator.
    pub const GENERATED_FREE: [ComponentType; 3] =
        [ComponentType::Title, ComponentType::Body, ComponentType::Cta];

    /// Wire name (`snake_case`) used in JSON payloads and wire keys.
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Subject => "subject",
            ComponentType::PreHeader => "pre_header",
            ComponentType::Title => "title",
            ComponentType::Body => "body",
            ComponentType::Cta => "cta",
            ComponentType::Image => "image",
        }
    }

    /// Human label used when a component is shown to the model as context.
    pub fn label(self) -> &'static str {
        match self {
            ComponentType::Subject => "Subject",
            ComponentType::PreHeader => "Pre-header",
            ComponentType::Title => "Title",
            ComponentType::Body => "Body",
            ComponentType::Cta => "CTA",
            ComponentType::Image => "Image",
        }
    }

    /// `true` for the singleton header slots that cannot be placed in sections.
    pub fn is_header(self) -> bool {
        matches!(self, ComponentType::Subject | ComponentType::PreHeader)
    }

    /// `true` for types whose content is text the generator writes.
    pub fn is_generated(self) -> bool {
        !matches!(self, ComponentType::Image)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown component type '{s}'. Must be one of: {}",
                    ComponentType::ALL.map(ComponentType::as_str).join(", ")
                ))
            })
    }
}
