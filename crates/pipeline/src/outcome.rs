//! Workflow errors and the result envelope returned by every action.

use serde::Serialize;

use mosaico_core::error::CoreError;
use mosaico_gateway::GatewayError;

/// Errors from workflow actions.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Input validation, missing records or a no-progress regeneration.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A collaborator call failed.
    #[error(transparent)]
    Collaborator(#[from] GatewayError),

    /// A collaborator answered successfully with unusable content.
    #[error("{0}")]
    InvalidResponse(String),

    /// The workspace was closed while the action was in flight; its result
    /// was discarded.
    #[error("Workspace for project {0} is closed")]
    Stale(mosaico_core::types::DbId),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Core(CoreError::Validation(message.into()))
    }
}

/// Uniform envelope: `{success, data?, error?, warnings}`.
///
/// Soft problems (dropped keys, partially failed translations, a cascade
/// that could not run) are reported as warnings on a successful outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            warnings: Vec::new(),
        }
    }

    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn warn_all<I, S>(mut self, warnings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.warnings.extend(warnings.into_iter().map(Into::into));
        self
    }
}
