//! Workflow orchestration over an open project.
//!
//! A [`ProjectWorkspace`] holds the versioned document state of one project.
//! [`Workflow`] runs the actions against it (generation, translation,
//! single-slot regeneration and edits, export, uploads and project
//! lifecycle) through the collaborator traits in [`collaborators`], and the
//! [`persistence`] bridge saves component changes in the background.

pub mod collaborators;
pub mod export;
pub mod generation;
pub mod lifecycle;
pub mod manager;
pub mod media;
pub mod outcome;
pub mod persistence;
pub mod regeneration;
pub mod translation;
pub mod workflow;
pub mod workspace;

pub use collaborators::Collaborators;
pub use manager::WorkspaceManager;
pub use outcome::{Outcome, WorkflowError};
pub use workflow::{Workflow, WorkflowConfig};
pub use workspace::{ProjectWorkspace, WorkspaceSnapshot};
