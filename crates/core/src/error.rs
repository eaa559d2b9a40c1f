use crate::component::ComponentType;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Component not found: {component_type} #{index}")]
    NotFound {
        component_type: ComponentType,
        index: u32,
    },

    #[error("No distinct variation for {component_type} #{index} after {attempts} candidates")]
    NoVariation {
        component_type: ComponentType,
        index: u32,
        attempts: usize,
    },

    #[error("Conflict: {0}")]
    Conflict(String),
}
