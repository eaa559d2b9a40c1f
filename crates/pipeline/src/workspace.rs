//! The shared, versioned state of one open project.
//!
//! The snapshot is immutable; every action computes a new one from the
//! latest snapshot under the write lock and swaps it in with a bumped
//! version. Actions suspend at collaborator calls without holding the lock,
//! so two actions on different slots interleave freely and each merge applies
//! its record-level change to whatever the other one left behind.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use mosaico_core::edit::SlotEditState;
use mosaico_core::generation::DEFAULT_TONE;
use mosaico_core::language::TargetLanguageSet;
use mosaico_core::project::{Project, ProjectStatus};
use mosaico_core::registry::ComponentRegistry;
use mosaico_core::structure::StructureSection;
use mosaico_core::types::DbId;
use mosaico_core::wire_key::format_wire_key;
use mosaico_core::ComponentType;

use crate::collaborators::ProjectStore;
use crate::outcome::WorkflowError;
use crate::persistence::{PersistStatus, PersistenceBridge, PersistenceConfig};

/// One immutable state of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceSnapshot {
    /// Monotonic, bumped on every swap.
    pub version: u64,
    pub project_id: DbId,
    pub name: String,
    pub brief: String,
    pub tone: String,
    pub status: ProjectStatus,
    pub labels: Vec<String>,
    pub sections: Vec<StructureSection>,
    pub registry: ComponentRegistry,
    pub languages: TargetLanguageSet,
    /// Sampling temperature of the last document generation.
    pub temperature: f64,
    /// Image used as generation context.
    pub image_url: Option<String>,
    /// Open edit drafts by wire key. Absent means viewing.
    pub edits: BTreeMap<String, SlotEditState>,
}

impl WorkspaceSnapshot {
    pub fn from_project(project: &Project, temperature: f64) -> Self {
        let document = project.document();
        let image_url = project
            .images
            .iter()
            .rev()
            .find_map(|i| i.gcs_public_url.clone());

        Self {
            version: 0,
            project_id: project.id,
            name: project.name.clone(),
            brief: project.brief_text.clone().unwrap_or_default(),
            tone: project
                .tone
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TONE.to_string()),
            status: project.status,
            labels: project.labels.clone(),
            sections: document.sections,
            registry: document.registry,
            languages: document.languages,
            temperature,
            image_url,
            edits: BTreeMap::new(),
        }
    }

    pub fn edit_state(&self, component_type: ComponentType, index: u32) -> SlotEditState {
        self.edits
            .get(&format_wire_key(component_type, index))
            .cloned()
            .unwrap_or_default()
    }

    /// Copy with the edit state of one slot replaced. Viewing entries are
    /// removed rather than stored.
    pub fn with_edit_state(
        &self,
        component_type: ComponentType,
        index: u32,
        state: SlotEditState,
    ) -> Self {
        let mut next = self.clone();
        let key = format_wire_key(component_type, index);
        match state {
            SlotEditState::Viewing => {
                next.edits.remove(&key);
            }
            editing => {
                next.edits.insert(key, editing);
            }
        }
        next
    }
}

pub struct ProjectWorkspace {
    project_id: DbId,
    state: RwLock<Arc<WorkspaceSnapshot>>,
    /// Cancelled when the workspace closes; late merges are discarded.
    liveness: CancellationToken,
    persistence: Arc<PersistenceBridge>,
}

impl ProjectWorkspace {
    /// Build a workspace from a freshly fetched project and start its
    /// persistence bridge.
    pub fn open(
        project: &Project,
        store: Arc<dyn ProjectStore>,
        persistence: PersistenceConfig,
        temperature: f64,
    ) -> Self {
        let liveness = CancellationToken::new();
        let persistence =
            PersistenceBridge::start(project.id, store, persistence, liveness.child_token());

        Self {
            project_id: project.id,
            state: RwLock::new(Arc::new(WorkspaceSnapshot::from_project(project, temperature))),
            liveness,
            persistence,
        }
    }

    pub fn project_id(&self) -> DbId {
        self.project_id
    }

    pub async fn snapshot(&self) -> Arc<WorkspaceSnapshot> {
        self.state.read().await.clone()
    }

    pub fn is_open(&self) -> bool {
        !self.liveness.is_cancelled()
    }

    pub fn ensure_open(&self) -> Result<(), WorkflowError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(WorkflowError::Stale(self.project_id))
        }
    }

    /// Apply `f` to the latest snapshot and swap in the result.
    ///
    /// Fails with [`WorkflowError::Stale`] once the workspace is closed, so
    /// responses that arrive after close are never merged.
    pub async fn update<R, F>(&self, f: F) -> Result<(Arc<WorkspaceSnapshot>, R), WorkflowError>
    where
        F: FnOnce(&WorkspaceSnapshot) -> Result<(WorkspaceSnapshot, R), WorkflowError>,
    {
        self.swap(f, false).await
    }

    /// Like [`Self::update`], and also schedule a save of the new registry.
    pub async fn commit<R, F>(&self, f: F) -> Result<(Arc<WorkspaceSnapshot>, R), WorkflowError>
    where
        F: FnOnce(&WorkspaceSnapshot) -> Result<(WorkspaceSnapshot, R), WorkflowError>,
    {
        self.swap(f, true).await
    }

    /// Replace the registry through a record-level transform and persist.
    pub async fn commit_registry<R, F>(
        &self,
        f: F,
    ) -> Result<(Arc<WorkspaceSnapshot>, R), WorkflowError>
    where
        F: FnOnce(&ComponentRegistry) -> Result<(ComponentRegistry, R), WorkflowError>,
    {
        self.commit(|s| {
            let (registry, result) = f(&s.registry)?;
            let mut next = s.clone();
            next.registry = registry;
            Ok((next, result))
        })
        .await
    }

    pub fn persist_status(&self) -> PersistStatus {
        self.persistence.status()
    }

    /// Persist the latest scheduled snapshot now.
    pub async fn flush(&self) -> bool {
        self.persistence.flush().await
    }

    /// Invalidate in-flight actions and flush pending saves.
    pub async fn close(&self) -> bool {
        self.liveness.cancel();
        let saved = self.persistence.flush().await;
        tracing::info!(project_id = self.project_id, saved, "Workspace closed");
        saved
    }

    // ---- private helpers ----

    /// Saves are scheduled before the write guard drops, so they reach the
    /// bridge in version order.
    async fn swap<R, F>(
        &self,
        f: F,
        persist: bool,
    ) -> Result<(Arc<WorkspaceSnapshot>, R), WorkflowError>
    where
        F: FnOnce(&WorkspaceSnapshot) -> Result<(WorkspaceSnapshot, R), WorkflowError>,
    {
        let mut guard = self.state.write().await;
        self.ensure_open()?;

        let (mut next, result) = f(&guard)?;
        next.version = guard.version + 1;
        let next = Arc::new(next);
        if persist {
            self.persistence.schedule(next.version, &next.registry);
        }
        *guard = next.clone();
        Ok((next, result))
    }
}

impl fmt::Debug for ProjectWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectWorkspace")
            .field("project_id", &self.project_id)
            .field("open", &self.is_open())
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}
