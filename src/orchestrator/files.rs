//! Upload staging and result download.

use crate::error::Result;
use crate::staging::Materialized;
use crate::types::{Event, TaskId, UploadId};

use super::TaskOrchestrator;

impl TaskOrchestrator {
    /// Stage an uploaded file, generating an upload id when none is given
    ///
    /// When `expand_archive` is set and the payload is a ZIP archive it is
    /// expanded in place.
    pub async fn stage_upload(
        &self,
        id: Option<UploadId>,
        filename: &str,
        bytes: Vec<u8>,
        expand_archive: bool,
    ) -> Result<UploadId> {
        let id = id.unwrap_or_default();
        let id = self
            .staging
            .stage(id, filename, bytes, expand_archive)
            .await?;

        tracing::info!(upload_id = %id, filename, expand_archive, "upload staged");
        self.emit_event(Event::Uploaded {
            id,
            filename: filename.to_string(),
        });
        Ok(id)
    }

    /// Read back a named file, or a ZIP bundle of the whole directory
    pub async fn materialize(&self, id: TaskId, filename: Option<&str>) -> Result<Materialized> {
        self.staging.materialize(id, filename).await
    }

    /// Delete one directory, or every directory when `id` is `None`
    ///
    /// Removing a working directory does not touch the task's registry entry.
    pub async fn remove_files(&self, id: Option<TaskId>) -> Result<usize> {
        self.staging.remove(id).await
    }
}
