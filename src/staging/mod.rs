//! Staging store: upload areas and task working directories on disk
//!
//! Every upload area and every task working directory is a directory named by
//! its identifier directly under the configured root. Uploads and downloads
//! run without coordination; directory deletion is serialized by a single
//! lock so a bulk delete never races a targeted one.

mod archive;


pub use archive::{build_zip, expand_zip, has_zip_extension, is_archive};

use crate::error::{Error, Result, StagingError};
use crate::types::{TaskId, UploadId};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File name used when a whole directory is served as one bundle
pub const BUNDLE_FILE_NAME: &str = "download.zip";

/// Bytes produced by [`StagingStore::materialize`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Materialized {
    /// A single file that was requested by name
    File {
        /// The file name
        name: String,
        /// Raw file content
        bytes: Vec<u8>,
    },
    /// A ZIP archive of the whole directory
    Bundle {
        /// ZIP bytes
        bytes: Vec<u8>,
    },
}

impl Materialized {
    /// Name the content should be delivered under
    pub fn file_name(&self) -> &str {
        match self {
            Self::File { name, .. } => name,
            Self::Bundle { .. } => BUNDLE_FILE_NAME,
        }
    }

    /// The content
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::File { bytes, .. } | Self::Bundle { bytes } => bytes,
        }
    }

    /// Consume into the content
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::File { bytes, .. } | Self::Bundle { bytes } => bytes,
        }
    }
}

/// Per-identifier directories under one root
#[derive(Debug)]
pub struct StagingStore {
    root: PathBuf,
    delete_lock: Mutex<()>,
}

impl StagingStore {
    /// Create a store rooted at `root` (the directory is created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            delete_lock: Mutex::new(()),
        }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory belonging to an identifier
    pub fn dir_for(&self, id: TaskId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Create the root directory if it does not exist yet
    pub async fn ensure_root(&self) -> Result<()> {
        create_dir(&self.root).await
    }

    /// Create (or reuse) the directory for an identifier and return its path
    pub async fn create_dir_for(&self, id: TaskId) -> Result<PathBuf> {
        let dir = self.dir_for(id);
        create_dir(&dir).await?;
        Ok(dir)
    }

    /// Store an uploaded file under an upload area
    ///
    /// Creates the area on first use. When `expand_archive` is set and the
    /// payload is a ZIP archive, it is expanded in place after being written,
    /// overwriting same-named files.
    pub async fn stage(
        &self,
        id: UploadId,
        filename: &str,
        bytes: Vec<u8>,
        expand_archive: bool,
    ) -> Result<UploadId> {
        validate_filename(filename)?;
        if bytes.is_empty() {
            return Err(Error::InvalidRequest(
                "upload payload must not be empty".to_string(),
            ));
        }

        let dir = self.create_dir_for(id).await?;
        let path = dir.join(filename);
        let expand = expand_archive && is_archive(filename, &bytes);

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| StagingError::WriteFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        debug!(upload_id = %id, ?path, size = bytes.len(), "staged upload");

        if expand {
            let archive_path = path.clone();
            let files = spawn_blocking(move || expand_zip(&archive_path, &dir))
                .await
                .map_err(|e| StagingError::ArchiveMalformed {
                    archive: path.clone(),
                    reason: format!("expansion task panicked: {}", e),
                })??;
            info!(upload_id = %id, ?path, files = files.len(), "expanded uploaded archive");
        }

        Ok(id)
    }

    /// Produce the content of an upload area or task working directory
    ///
    /// Returns the named file when it exists, otherwise a ZIP bundle of the
    /// whole directory. Fails with `NotFound` when the directory is missing or
    /// holds no files.
    pub async fn materialize(&self, id: TaskId, filename: Option<&str>) -> Result<Materialized> {
        let dir = self.dir_for(id);

        if let Some(name) = filename.filter(|n| !n.is_empty()) {
            validate_filename(name)?;
            let path = dir.join(name);
            if tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
            {
                let bytes = tokio::fs::read(&path).await?;
                debug!(id = %id, ?path, "materialized single file");
                return Ok(Materialized::File {
                    name: name.to_string(),
                    bytes,
                });
            }
        }

        let scan_dir = dir.clone();
        let bytes = spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            if !contains_files(&scan_dir) {
                return Ok(None);
            }
            Ok(Some(build_zip(&scan_dir)?))
        })
        .await
        .map_err(|e| StagingError::ArchiveBuildFailed {
            path: dir.clone(),
            reason: format!("bundle task panicked: {}", e),
        })??;

        match bytes {
            Some(bytes) => {
                debug!(id = %id, ?dir, size = bytes.len(), "materialized bundle");
                Ok(Materialized::Bundle { bytes })
            }
            None => Err(Error::NotFound(format!("no files for {}", id))),
        }
    }

    /// Delete the directory for `id`, or every top-level directory when `id` is `None`
    ///
    /// A bulk delete is best-effort: each directory is removed independently,
    /// failures are logged and the remaining directories are still removed.
    /// Returns the number of directories removed.
    pub async fn remove(&self, id: Option<TaskId>) -> Result<usize> {
        let _guard = self.delete_lock.lock().await;

        match id {
            Some(id) => {
                let dir = self.dir_for(id);
                match tokio::fs::remove_dir_all(&dir).await {
                    Ok(()) => {
                        info!(id = %id, ?dir, "removed directory");
                        Ok(1)
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(Error::NotFound(format!("directory for {}", id)))
                    }
                    Err(e) => Err(Error::Io(e)),
                }
            }
            None => self.remove_all().await,
        }
    }

    async fn remove_all(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                dirs.push(entry.path());
            }
        }

        let mut removed = 0;
        for dir in dirs {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(?dir, "directory already gone");
                    removed += 1;
                }
                Err(e) => warn!(?dir, error = %e, "failed to remove directory"),
            }
        }

        info!(root = ?self.root, removed, "removed staged directories");
        Ok(removed)
    }

    /// Copy an upload area into `dest_dir`, preserving relative paths
    ///
    /// ZIP files are skipped, so an archive that was already expanded on upload
    /// is not copied a second time as a blob. Returns the number of files copied.
    pub async fn copy_into(&self, source: UploadId, dest_dir: &Path) -> Result<usize> {
        let source_dir = self.dir_for(source);
        if !tokio::fs::metadata(&source_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(Error::NotFound(format!("upload area {}", source)));
        }

        let dest = dest_dir.to_path_buf();
        let copied = spawn_blocking(move || copy_tree(&source_dir, &dest))
            .await
            .map_err(|e| Error::Other(format!("copy task panicked: {}", e)))??;

        debug!(upload_id = %source, ?dest_dir, files = copied, "copied upload area");
        Ok(copied)
    }
}

/// Reject names that are empty or could address anything outside one directory
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(Error::InvalidRequest("filename must not be empty".to_string()));
    }
    if filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
        || filename.contains('\0')
    {
        return Err(Error::InvalidRequest(format!(
            "filename '{}' must not contain path separators or '..'",
            filename
        )));
    }
    Ok(())
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| StagingError::CreateDirFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(())
}

fn contains_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file())
}

fn copy_tree(source_dir: &Path, dest_dir: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source_dir).min_depth(1) {
        let entry = entry.map_err(|e| StagingError::CopyFailed {
            source_path: source_dir.to_path_buf(),
            dest_path: dest_dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::Other(e.to_string()))?;
        let target = dest_dir.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| StagingError::CreateDirFailed {
                path: target.clone(),
                reason: e.to_string(),
            })?;
            continue;
        }
        if !entry.file_type().is_file() || has_zip_extension(entry.path()) {
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StagingError::CreateDirFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::copy(entry.path(), &target).map_err(|e| StagingError::CopyFailed {
            source_path: entry.path().to_path_buf(),
            dest_path: target.clone(),
            reason: e.to_string(),
        })?;
        copied += 1;
    }
    Ok(copied)
}
