//! Mosaico domain model.
//!
//! Pure, I/O-free building blocks of the email content workflow: the
//! section structure, the component registry and its display-index
//! resolution, wire keys, target languages, and the policies behind
//! generation, regeneration and translation merges.

pub mod cache;
pub mod component;
pub mod edit;
pub mod error;
pub mod generation;
pub mod language;
pub mod project;
pub mod registry;
pub mod regeneration;
pub mod structure;
pub mod translation;
pub mod types;
pub mod wire_key;

pub use component::ComponentType;
pub use error::CoreError;
pub use registry::{ComponentRecord, ComponentRegistry, TranslationMap};
pub use structure::StructureSection;
pub use wire_key::WireKey;
