//! Image uploads and the per-project image cache.

use serde::Serialize;

use mosaico_core::project::ImageRecord;
use mosaico_core::types::DbId;

use crate::outcome::{Outcome, WorkflowError};
use crate::workflow::Workflow;
use crate::workspace::{ProjectWorkspace, WorkspaceSnapshot};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub version: u64,
    pub image: ImageRecord,
    /// Image slot the upload was attached to, if any.
    pub slot: Option<u32>,
}

impl Workflow {
    /// Upload an image for the workspace's project.
    ///
    /// The image becomes the generation context image. With `slot` set, it
    /// is also attached to that image slot and the registry is saved.
    pub async fn upload_image(
        &self,
        ws: &ProjectWorkspace,
        filename: &str,
        bytes: Vec<u8>,
        slot: Option<u32>,
    ) -> Result<Outcome<UploadReport>, WorkflowError> {
        ws.ensure_open()?;
        validate_upload(filename, &bytes)?;
        if slot == Some(0) {
            return Err(WorkflowError::validation("Image slot indices start at 1"));
        }

        let size = bytes.len();
        let image = self
            .collaborators
            .uploader
            .upload_image(ws.project_id(), filename.trim(), bytes)
            .await?;
        self.remember_upload(&image).await;

        let url = image.gcs_public_url.clone();
        let apply = |s: &WorkspaceSnapshot| -> Result<(WorkspaceSnapshot, ()), WorkflowError> {
            let mut next = s.clone();
            if let Some(url) = &url {
                next.image_url = Some(url.clone());
                if let Some(index) = slot {
                    next.registry = s.registry.attach_media(index, url, Some(image.id));
                }
            }
            Ok((next, ()))
        };
        let (snapshot, _) = if slot.is_some() && url.is_some() {
            ws.commit(apply).await?
        } else {
            ws.update(apply).await?
        };

        tracing::info!(
            project_id = ws.project_id(),
            image_id = image.id,
            size,
            slot = ?slot,
            "Image uploaded",
        );

        let mut outcome = Outcome::ok(UploadReport {
            version: snapshot.version,
            image,
            slot,
        });
        if url.is_none() {
            outcome = outcome.warn("Uploaded image has no public URL and was not attached");
        }
        Ok(outcome)
    }

    /// Images known for a project, from the local cache.
    pub async fn cached_images(&self, project_id: DbId) -> Vec<ImageRecord> {
        let cache = self.images.lock().await;
        cache
            .get(project_id, chrono::Utc::now())
            .cloned()
            .unwrap_or_default()
    }

    async fn remember_upload(&self, image: &ImageRecord) {
        let now = chrono::Utc::now();
        let mut cache = self.images.lock().await;
        let mut images = cache.get(image.project_id, now).cloned().unwrap_or_default();
        images.retain(|i| i.id != image.id);
        images.push(image.clone());
        cache.put(image.project_id, images, now);
    }
}

fn validate_upload(filename: &str, bytes: &[u8]) -> Result<(), WorkflowError> {
    if filename.trim().is_empty() {
        return Err(WorkflowError::validation("Upload needs a filename"));
    }
    if bytes.is_empty() {
        return Err(WorkflowError::validation("Uploaded file is empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(WorkflowError::validation(format!(
            "Uploaded file exceeds {} MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}
