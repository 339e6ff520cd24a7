//! Job descriptions submitted with a task
//!
//! The job body is opaque to the orchestrator apart from one typed field,
//! `uploadGuids`, which names the upload areas to copy into the task's
//! working directory. It is parsed once when the task is submitted.

use crate::error::{Error, Result};
use crate::types::UploadId;
use serde::Deserialize;

/// A submitted job: the raw JSON text plus the fields the orchestrator reads
#[derive(Clone, Debug)]
pub struct JobDescription {
    raw: String,
    upload_ids: Vec<UploadId>,
}

/// Partial schema of the job body
#[derive(Deserialize)]
struct JobReferences {
    #[serde(rename = "uploadGuids", default)]
    upload_guids: Option<Vec<String>>,
}

impl JobDescription {
    /// Parse a job body
    ///
    /// Rejects an empty body, a body that is not a JSON object, and an
    /// `uploadGuids` field that is not an array of identifiers.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "job description must not be empty".to_string(),
            ));
        }

        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidRequest(format!("job description is not valid JSON: {}", e))
        })?;
        if !value.is_object() {
            return Err(Error::InvalidRequest(
                "job description must be a JSON object".to_string(),
            ));
        }

        let refs: JobReferences = serde_json::from_value(value)
            .map_err(|e| Error::InvalidRequest(format!("invalid uploadGuids: {}", e)))?;

        let mut upload_ids = Vec::new();
        for guid in refs.upload_guids.unwrap_or_default() {
            let id: UploadId = guid.parse().map_err(|e| {
                Error::InvalidRequest(format!("invalid upload id '{}': {}", guid, e))
            })?;
            if !upload_ids.contains(&id) {
                upload_ids.push(id);
            }
        }

        Ok(Self { raw, upload_ids })
    }

    /// The job body exactly as submitted
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Upload areas referenced by the job, in order, without duplicates
    pub fn upload_ids(&self) -> &[UploadId] {
        &self.upload_ids
    }
}
