//! Handlebar template export.

use serde::Serialize;

use mosaico_core::ComponentType;
use mosaico_gateway::messages::HandlebarRequest;

use crate::outcome::{Outcome, WorkflowError};
use crate::workflow::Workflow;
use crate::workspace::ProjectWorkspace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlebarExport {
    pub component_key: String,
    /// Opaque template text, returned as produced by the exporter.
    pub handlebar_template: String,
    pub languages: Vec<String>,
}

impl Workflow {
    /// Build the handlebar template of one record from its translations,
    /// with the English content as fallback.
    pub async fn export_handlebar(
        &self,
        ws: &ProjectWorkspace,
        component_type: ComponentType,
        index: u32,
    ) -> Result<Outcome<HandlebarExport>, WorkflowError> {
        ws.ensure_open()?;
        let snap = ws.snapshot().await;
        let record = snap.registry.require(component_type, index)?;

        let request = HandlebarRequest {
            component_key: record.wire_key(),
            translations: record.translations.clone(),
            english_fallback: record.generated_content.clone(),
        };
        let response = self
            .collaborators
            .exporter
            .generate_handlebar(&request)
            .await?;

        tracing::info!(
            project_id = ws.project_id(),
            component_type = %component_type,
            component_index = index,
            languages = request.translations.len(),
            "Handlebar template exported",
        );

        let mut outcome = Outcome::ok(HandlebarExport {
            component_key: response.component_key,
            handlebar_template: response.handlebar_template,
            languages: request.translations.keys().cloned().collect(),
        });
        if request.translations.is_empty() {
            outcome = outcome.warn(format!(
                "'{}' has no translations; the template only carries the English text",
                request.component_key
            ));
        }
        Ok(outcome)
    }
}
