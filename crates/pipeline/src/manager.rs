//! Registry of open project workspaces.
//!
//! [`WorkspaceManager`] owns the shared [`Workflow`] and at most one
//! [`ProjectWorkspace`] per project. Handlers look workspaces up by project
//! id; closing removes the workspace, invalidates its in-flight actions and
//! flushes its pending saves.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use mosaico_core::types::DbId;

use crate::outcome::WorkflowError;
use crate::workflow::Workflow;
use crate::workspace::ProjectWorkspace;

/// Upper bound on the time spent flushing one workspace during shutdown.
const SHUTDOWN_FLUSH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

pub struct WorkspaceManager {
    workflow: Arc<Workflow>,
    workspaces: RwLock<HashMap<DbId, Arc<ProjectWorkspace>>>,
}

impl WorkspaceManager {
    pub fn new(workflow: Arc<Workflow>) -> Arc<Self> {
        Arc::new(Self {
            workflow,
            workspaces: RwLock::new(HashMap::new()),
        })
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    /// The open workspace of `project_id`, if any.
    pub async fn get(&self, project_id: DbId) -> Option<Arc<ProjectWorkspace>> {
        self.workspaces.read().await.get(&project_id).cloned()
    }

    /// The open workspace of `project_id`, opening it from the project
    /// store on first use.
    pub async fn get_or_open(&self, project_id: DbId) -> Result<Arc<ProjectWorkspace>, WorkflowError> {
        if let Some(ws) = self.get(project_id).await {
            return Ok(ws);
        }

        let opened = Arc::new(self.workflow.open_workspace(project_id).await?);

        let mut workspaces = self.workspaces.write().await;
        // Another request may have opened it while we were fetching.
        if let Some(existing) = workspaces.get(&project_id) {
            opened.close().await;
            return Ok(existing.clone());
        }
        workspaces.insert(project_id, opened.clone());
        Ok(opened)
    }

    /// Close and forget the workspace of `project_id`. Returns `false` if
    /// none was open.
    pub async fn close(&self, project_id: DbId) -> bool {
        let removed = self.workspaces.write().await.remove(&project_id);
        match removed {
            Some(ws) => {
                self.workflow.close_workspace(&ws).await;
                true
            }
            None => false,
        }
    }

    pub async fn open_ids(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = self.workspaces.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Close every workspace, waiting a bounded time for each flush.
    pub async fn shutdown(&self) {
        let drained: Vec<_> = self.workspaces.write().await.drain().collect();
        tracing::info!(count = drained.len(), "Closing open workspaces");

        for (project_id, ws) in drained {
            match tokio::time::timeout(SHUTDOWN_FLUSH_TIMEOUT, ws.close()).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(project_id, "Pending components were not saved on shutdown");
                }
                Err(_) => {
                    tracing::warn!(project_id, "Timed out flushing workspace on shutdown");
                }
            }
        }
    }
}
