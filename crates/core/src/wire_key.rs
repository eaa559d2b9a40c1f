//! Wire keys: the `type` / `type_index` strings used to address components
//! across the generation and translation API boundary.
//!
//! Index 1 is written without a suffix (`body`), every other index with one
//! (`body_2`). Parsing accepts both forms for index 1 (`body`, `body_1`)
//! because the generator answers with suffixed keys.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::component::ComponentType;

/// Regex pattern for a wire key: a component type with an optional numeric
/// index suffix.
pub const WIRE_KEY_PATTERN: &str = r"^(subject|pre_header|title|body|cta|image)(?:_(\d+))?$";

static WIRE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(WIRE_KEY_PATTERN).expect("valid regex"));

/// Result of parsing an untrusted key returned by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireKey {
    Parsed {
        component_type: ComponentType,
        index: u32,
    },
    Unparsable(String),
}

impl WireKey {
    /// Parse a key from a generation or translation response.
    pub fn parse(raw: &str) -> WireKey {
        let Some(caps) = WIRE_KEY_RE.captures(raw) else {
            return WireKey::Unparsable(raw.to_string());
        };
        let Ok(component_type) = caps[1].parse::<ComponentType>() else {
            return WireKey::Unparsable(raw.to_string());
        };
        let index = match caps.get(2) {
            None => 1,
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(i) if i >= 1 => i,
                _ => return WireKey::Unparsable(raw.to_string()),
            },
        };
        WireKey::Parsed {
            component_type,
            index,
        }
    }
}

/// Canonical wire key for a component slot.
pub fn format_wire_key(component_type: ComponentType, index: u32) -> String {
    if index <= 1 {
        component_type.as_str().to_string()
    } else {
        format!("{}_{index}", component_type.as_str())
    }
}

impl fmt::Display for WireKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireKey::Parsed {
                component_type,
                index,
            } => f.write_str(&format_wire_key(*component_type, *index)),
            WireKey::Unparsable(raw) => f.write_str(raw),
        }
    }
}
