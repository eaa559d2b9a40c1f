//! The action entry point shared by every orchestrator.

use tokio::sync::Mutex;

use mosaico_core::cache::LocalCache;
use mosaico_core::generation::DEFAULT_TEMPERATURE;
use mosaico_core::project::ImageRecord;

use crate::collaborators::Collaborators;
use crate::persistence::PersistenceConfig;

/// Default number of translation calls in flight per batch.
pub const DEFAULT_TRANSLATION_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub translation_concurrency: usize,
    pub default_temperature: f64,
    pub persistence: PersistenceConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            translation_concurrency: DEFAULT_TRANSLATION_CONCURRENCY,
            default_temperature: DEFAULT_TEMPERATURE,
            persistence: PersistenceConfig::default(),
        }
    }
}

/// Orchestrates generation, translation, regeneration, export and project
/// lifecycle actions against a [`crate::ProjectWorkspace`].
///
/// The actions are spread over the orchestrator modules as `impl Workflow`
/// blocks.
pub struct Workflow {
    pub(crate) collaborators: Collaborators,
    pub(crate) config: WorkflowConfig,
    /// Uploaded image metadata per project.
    pub(crate) images: Mutex<LocalCache<Vec<ImageRecord>>>,
}

impl Workflow {
    pub fn new(collaborators: Collaborators, config: WorkflowConfig) -> Self {
        Self {
            collaborators,
            config,
            images: Mutex::new(LocalCache::default()),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }
}
