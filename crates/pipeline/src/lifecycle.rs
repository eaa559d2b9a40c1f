//! Opening, reloading, updating and restructuring a project workspace.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mosaico_core::generation::validate_tone;
use mosaico_core::language::TargetLanguageSet;
use mosaico_core::project::{Project, ProjectUpdate};
use mosaico_core::registry::{slots, ComponentRecord, Slot};
use mosaico_core::structure::{
    add_component, add_section, move_component, move_section, remove_component,
    remove_section, rename_section, StructureSection,
};
use mosaico_core::types::DbId;
use mosaico_core::ComponentType;

use crate::outcome::{Outcome, WorkflowError};
use crate::persistence::PersistStatus;
use crate::workflow::Workflow;
use crate::workspace::{ProjectWorkspace, WorkspaceSnapshot};

/// A structural edit from the section builder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StructureEdit {
    AddSection {
        name: String,
    },
    RenameSection {
        key: String,
        name: String,
    },
    RemoveSection {
        key: String,
    },
    MoveSection {
        key: String,
        to: usize,
    },
    AddComponent {
        section_key: String,
        component: ComponentType,
        #[serde(default)]
        position: Option<usize>,
    },
    RemoveComponent {
        section_key: String,
        position: usize,
    },
    MoveComponent {
        from_key: String,
        from_position: usize,
        to_key: String,
        to_position: usize,
    },
}

impl StructureEdit {
    pub fn apply(&self, sections: &[StructureSection]) -> Result<Vec<StructureSection>, WorkflowError> {
        let next = match self {
            StructureEdit::AddSection { name } => add_section(sections, name)?.0,
            StructureEdit::RenameSection { key, name } => rename_section(sections, key, name)?,
            StructureEdit::RemoveSection { key } => remove_section(sections, key)?,
            StructureEdit::MoveSection { key, to } => move_section(sections, key, *to)?,
            StructureEdit::AddComponent {
                section_key,
                component,
                position,
            } => add_component(sections, section_key, *component, *position)?,
            StructureEdit::RemoveComponent {
                section_key,
                position,
            } => remove_component(sections, section_key, *position)?,
            StructureEdit::MoveComponent {
                from_key,
                from_position,
                to_key,
                to_position,
            } => move_component(sections, from_key, *from_position, to_key, *to_position)?,
        };
        Ok(next)
    }
}

/// Everything a client needs to render a workspace.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceView {
    #[serde(flatten)]
    pub snapshot: WorkspaceSnapshot,
    /// Every slot in reading order.
    pub slots: Vec<Slot>,
    /// Records kept in the registry without a slot in the structure.
    pub orphans: Vec<ComponentRecord>,
    pub persistence: PersistStatus,
}

impl WorkspaceView {
    pub async fn of(ws: &ProjectWorkspace) -> Self {
        let snapshot = ws.snapshot().await;
        Self::from_snapshot(snapshot, ws.persist_status())
    }

    pub fn from_snapshot(snapshot: Arc<WorkspaceSnapshot>, persistence: PersistStatus) -> Self {
        let orphans = snapshot
            .registry
            .orphans(&snapshot.sections)
            .into_iter()
            .cloned()
            .collect();
        Self {
            slots: slots(&snapshot.sections),
            orphans,
            snapshot: Arc::unwrap_or_clone(snapshot),
            persistence,
        }
    }
}

impl Workflow {
    /// Fetch a project and open a workspace over it.
    pub async fn open_workspace(&self, project_id: DbId) -> Result<ProjectWorkspace, WorkflowError> {
        let project = self.collaborators.store.get_project(project_id).await?;
        self.remember_images(&project).await;

        let ws = ProjectWorkspace::open(
            &project,
            self.collaborators.store.clone(),
            self.config.persistence.clone(),
            self.config.default_temperature,
        );

        let snap = ws.snapshot().await;
        tracing::info!(
            project_id,
            sections = snap.sections.len(),
            records = snap.registry.len(),
            orphans = snap.registry.orphans(&snap.sections).len(),
            languages = snap.languages.len(),
            "Workspace opened",
        );
        Ok(ws)
    }

    /// Replace the workspace state with the stored project. The stored
    /// project is authoritative; open drafts are discarded.
    pub async fn reload_workspace(
        &self,
        ws: &ProjectWorkspace,
    ) -> Result<Outcome<WorkspaceView>, WorkflowError> {
        ws.ensure_open()?;
        let project = self.collaborators.store.get_project(ws.project_id()).await?;
        self.remember_images(&project).await;

        let (snapshot, _) = ws
            .update(|s| Ok((WorkspaceSnapshot::from_project(&project, s.temperature), ())))
            .await?;
        tracing::info!(project_id = ws.project_id(), version = snapshot.version, "Workspace reloaded");
        Ok(Outcome::ok(WorkspaceView::from_snapshot(snapshot, ws.persist_status())))
    }

    /// Update project fields locally and in the store.
    ///
    /// A language change prunes translations immediately, like
    /// [`Workflow::set_target_languages`].
    pub async fn update_project(
        &self,
        ws: &ProjectWorkspace,
        update: ProjectUpdate,
    ) -> Result<Outcome<WorkspaceView>, WorkflowError> {
        let update = update.validated()?;
        if let Some(tone) = &update.tone {
            validate_tone(tone)?;
        }
        if update.is_empty() {
            return Ok(Outcome::ok(WorkspaceView::of(ws).await));
        }

        let apply = |s: &WorkspaceSnapshot| -> Result<(WorkspaceSnapshot, ()), WorkflowError> {
            let mut next = s.clone();
            if let Some(name) = &update.name {
                next.name = name.clone();
            }
            if let Some(brief) = &update.brief_text {
                next.brief = brief.trim().to_string();
            }
            if let Some(tone) = &update.tone {
                next.tone = tone.clone();
            }
            if let Some(labels) = &update.labels {
                next.labels = labels.clone();
            }
            if let Some(status) = update.status {
                next.status = status;
            }
            if let Some(sections) = &update.structure {
                next.sections = sections.clone();
                next.edits.clear();
            }
            if let Some(languages) = &update.target_languages {
                next.languages = TargetLanguageSet::from_stored(languages);
                next.registry = next.registry.prune_languages(&next.languages);
            }
            Ok((next, ()))
        };

        let (snapshot, _) = if update.target_languages.is_some() {
            ws.commit(apply).await?
        } else {
            ws.update(apply).await?
        };

        let mut outcome = Outcome::ok(WorkspaceView::from_snapshot(snapshot, ws.persist_status()));
        if let Some(warning) = self.sync_project(ws, &update).await {
            outcome = outcome.warn(warning);
        }
        Ok(outcome)
    }

    /// Apply a structural edit. Records of removed slots stay in the
    /// registry as orphans.
    pub async fn edit_structure(
        &self,
        ws: &ProjectWorkspace,
        edit: StructureEdit,
    ) -> Result<Outcome<WorkspaceView>, WorkflowError> {
        let (snapshot, _) = ws
            .update(|s| {
                let mut next = s.clone();
                next.sections = edit.apply(&s.sections)?;
                // Drafts are addressed by display index, which the edit may shift.
                next.edits.clear();
                Ok((next, ()))
            })
            .await?;

        tracing::debug!(
            project_id = ws.project_id(),
            version = snapshot.version,
            edit = ?edit,
            "Structure edited",
        );

        let update = ProjectUpdate {
            structure: Some(snapshot.sections.clone()),
            ..Default::default()
        };
        let mut outcome = Outcome::ok(WorkspaceView::from_snapshot(snapshot, ws.persist_status()));
        if let Some(warning) = self.sync_project(ws, &update).await {
            outcome = outcome.warn(warning);
        }
        Ok(outcome)
    }

    /// Close a workspace: in-flight actions are discarded and pending
    /// component saves are flushed.
    pub async fn close_workspace(&self, ws: &ProjectWorkspace) -> bool {
        ws.close().await
    }

    // ---- crate helpers ----

    /// Send project field changes to the store. Failures are logged and
    /// returned as a warning; local state is kept either way.
    pub(crate) async fn sync_project(
        &self,
        ws: &ProjectWorkspace,
        update: &ProjectUpdate,
    ) -> Option<String> {
        if update.is_empty() {
            return None;
        }
        match self
            .collaborators
            .store
            .update_project(ws.project_id(), update)
            .await
        {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(project_id = ws.project_id(), error = %e, "Saving project fields failed");
                Some(format!("Project changes were not saved: {e}"))
            }
        }
    }

    async fn remember_images(&self, project: &Project) {
        let mut cache = self.images.lock().await;
        cache.reconcile(project.id, project.images.clone(), chrono::Utc::now());
    }
}
