//! Handlers for the `/workspaces` resource.
//!
//! Every action runs against the project's shared workspace, opening it from
//! the project store on first use. Action results use the outcome envelope;
//! soft problems travel in its `warnings`.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use mosaico_core::error::CoreError;
use mosaico_core::language::TargetLanguageSet;
use mosaico_core::project::{ImageRecord, ProjectUpdate};
use mosaico_core::types::DbId;
use mosaico_core::ComponentType;
use mosaico_gateway::messages::{OptimizePromptResponse, RefineOperation};
use mosaico_pipeline::export::HandlebarExport;
use mosaico_pipeline::generation::{GenerateInput, GenerationReport};
use mosaico_pipeline::lifecycle::{StructureEdit, WorkspaceView};
use mosaico_pipeline::media::UploadReport;
use mosaico_pipeline::persistence::PersistStatus;
use mosaico_pipeline::regeneration::{SlotEdit, SlotUpdate};
use mosaico_pipeline::translation::{ComponentTranslation, TranslationReport};
use mosaico_pipeline::{Outcome, ProjectWorkspace};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

type SlotPath = Path<(DbId, String, String)>;

/// Parse the `{component_type}/{index}` path segments.
fn parse_slot(component_type: &str, index: &str) -> Result<(ComponentType, u32), AppError> {
    let component_type: ComponentType = component_type.parse()?;
    let index: u32 = index
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid component index '{index}'")))?;
    if index == 0 {
        return Err(AppError::BadRequest("Component indices start at 1".to_string()));
    }
    Ok((component_type, index))
}

async fn workspace(state: &AppState, project_id: DbId) -> AppResult<Arc<ProjectWorkspace>> {
    Ok(state.workspaces.get_or_open(project_id).await?)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// GET /api/v1/workspaces
pub async fn list_open(State(state): State<AppState>) -> Json<DataResponse<Vec<DbId>>> {
    Json(DataResponse {
        data: state.workspaces.open_ids().await,
    })
}

/// GET /api/v1/workspaces/{id}
///
/// Open the project's workspace if needed and return its current view.
pub async fn open(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<WorkspaceView>>> {
    let ws = workspace(&state, project_id).await?;
    Ok(Json(DataResponse {
        data: WorkspaceView::of(&ws).await,
    }))
}

/// PUT /api/v1/workspaces/{id}
pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(update): Json<ProjectUpdate>,
) -> AppResult<Json<Outcome<WorkspaceView>>> {
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(workflow.update_project(&ws, update).await?))
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub project_id: DbId,
    pub closed: bool,
}

/// DELETE /api/v1/workspaces/{id}
///
/// Close the workspace, flushing pending component saves.
pub async fn close(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<CloseResponse>>> {
    if !state.workspaces.close(project_id).await {
        return Err(AppError::WorkspaceNotOpen(project_id));
    }
    Ok(Json(DataResponse {
        data: CloseResponse {
            project_id,
            closed: true,
        },
    }))
}

/// POST /api/v1/workspaces/{id}/reload
pub async fn reload(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<Outcome<WorkspaceView>>> {
    let ws = workspace(&state, project_id).await?;
    Ok(Json(state.workspaces.workflow().reload_workspace(&ws).await?))
}

/// POST /api/v1/workspaces/{id}/flush
pub async fn flush(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<PersistStatus>>> {
    let ws = state
        .workspaces
        .get(project_id)
        .await
        .ok_or(AppError::WorkspaceNotOpen(project_id))?;
    ws.flush().await;
    Ok(Json(DataResponse {
        data: ws.persist_status(),
    }))
}

/// POST /api/v1/workspaces/{id}/structure
pub async fn edit_structure(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(edit): Json<StructureEdit>,
) -> AppResult<Json<Outcome<WorkspaceView>>> {
    let ws = workspace(&state, project_id).await?;
    Ok(Json(state.workspaces.workflow().edit_structure(&ws, edit).await?))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// POST /api/v1/workspaces/{id}/generate
pub async fn generate(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<GenerateInput>,
) -> AppResult<Json<Outcome<GenerationReport>>> {
    let ws = workspace(&state, project_id).await?;
    Ok(Json(state.workspaces.workflow().generate(&ws, input).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct OptimizePromptInput {
    pub brief: Option<String>,
    pub tone: Option<String>,
}

/// POST /api/v1/workspaces/{id}/optimize-prompt
pub async fn optimize_prompt(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<OptimizePromptInput>,
) -> AppResult<Json<Outcome<OptimizePromptResponse>>> {
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.optimize_prompt(&ws, input.brief, input.tone).await?,
    ))
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

/// POST /api/v1/workspaces/{id}/translate
pub async fn translate_document(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<Outcome<TranslationReport>>> {
    let ws = workspace(&state, project_id).await?;
    Ok(Json(state.workspaces.workflow().translate_document(&ws).await?))
}

#[derive(Debug, Deserialize)]
pub struct LanguagesInput {
    pub languages: Vec<String>,
}

/// PUT /api/v1/workspaces/{id}/languages
pub async fn set_languages(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<LanguagesInput>,
) -> AppResult<Json<Outcome<TargetLanguageSet>>> {
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.set_target_languages(&ws, &input.languages).await?,
    ))
}

/// POST /api/v1/workspaces/{id}/components/{type}/{index}/translate
pub async fn translate_component(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
) -> AppResult<Json<Outcome<ComponentTranslation>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.translate_component(&ws, component_type, index).await?,
    ))
}

// ---------------------------------------------------------------------------
// Single-slot writes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ContentInput {
    pub content: String,
}

/// PUT /api/v1/workspaces/{id}/components/{type}/{index}
pub async fn save_component(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
    Json(input): Json<ContentInput>,
) -> AppResult<Json<Outcome<SlotUpdate>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.save_edit(&ws, component_type, index, &input.content).await?,
    ))
}

/// POST /api/v1/workspaces/{id}/components/{type}/{index}/regenerate
pub async fn regenerate(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
) -> AppResult<Json<Outcome<SlotUpdate>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.regenerate_single(&ws, component_type, index).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct RefineInput {
    pub operation: RefineOperation,
}

/// POST /api/v1/workspaces/{id}/components/{type}/{index}/refine
pub async fn refine(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
    Json(input): Json<RefineInput>,
) -> AppResult<Json<Outcome<SlotUpdate>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.refine(&ws, component_type, index, input.operation).await?,
    ))
}

/// GET /api/v1/workspaces/{id}/components/{type}/{index}/handlebar
pub async fn export_handlebar(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
) -> AppResult<Json<Outcome<HandlebarExport>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.export_handlebar(&ws, component_type, index).await?,
    ))
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// POST /api/v1/workspaces/{id}/components/{type}/{index}/draft
pub async fn begin_edit(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
) -> AppResult<Json<Outcome<SlotEdit>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(workflow.begin_edit(&ws, component_type, index).await?))
}

#[derive(Debug, Deserialize)]
pub struct DraftInput {
    pub draft: String,
}

/// PUT /api/v1/workspaces/{id}/components/{type}/{index}/draft
pub async fn update_draft(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
    Json(input): Json<DraftInput>,
) -> AppResult<Json<Outcome<SlotEdit>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.update_draft(&ws, component_type, index, &input.draft).await?,
    ))
}

/// DELETE /api/v1/workspaces/{id}/components/{type}/{index}/draft
pub async fn cancel_edit(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
) -> AppResult<Json<Outcome<SlotEdit>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(workflow.cancel_edit(&ws, component_type, index).await?))
}

/// POST /api/v1/workspaces/{id}/components/{type}/{index}/draft/save
pub async fn save_draft(
    State(state): State<AppState>,
    Path((project_id, component_type, index)): SlotPath,
) -> AppResult<Json<Outcome<SlotUpdate>>> {
    let (component_type, index) = parse_slot(&component_type, &index)?;
    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(workflow.save_draft(&ws, component_type, index).await?))
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// GET /api/v1/workspaces/{id}/images
pub async fn list_images(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> Json<DataResponse<Vec<ImageRecord>>> {
    Json(DataResponse {
        data: state.workspaces.workflow().cached_images(project_id).await,
    })
}

/// POST /api/v1/workspaces/{id}/images
///
/// Multipart fields: `file` (required) and `slot` (optional image slot
/// index to attach the upload to).
pub async fn upload_image(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<Json<Outcome<UploadReport>>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut slot: Option<u32> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("slot") => {
                let text = field.text().await?;
                let index = text.trim().parse().map_err(|_| {
                    AppError::BadRequest(format!("Invalid image slot '{text}'"))
                })?;
                slot = Some(index);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::from(CoreError::Validation("Missing 'file' field".to_string())))?;

    let ws = workspace(&state, project_id).await?;
    let workflow = state.workspaces.workflow();
    Ok(Json(
        workflow.upload_image(&ws, &filename, bytes, slot).await?,
    ))
}
