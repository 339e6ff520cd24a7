//! ZIP helpers for the staging store
//!
//! Both functions are blocking and are meant to run under `spawn_blocking`.

use crate::error::StagingError;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";

/// Whether a staged payload should be treated as a ZIP archive
///
/// Recognized by a `.zip` extension or by the ZIP signature at the start of the payload.
pub fn is_archive(filename: &str, bytes: &[u8]) -> bool {
    has_zip_extension(Path::new(filename))
        || bytes.starts_with(ZIP_LOCAL_HEADER)
        || bytes.starts_with(ZIP_EMPTY_ARCHIVE)
}

/// Whether a path carries a `.zip` extension (case-insensitive)
pub fn has_zip_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Expand an archive into `dest_dir`, overwriting same-named files
///
/// Entries whose names would escape `dest_dir` are skipped. Returns the
/// files written.
pub fn expand_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, StagingError> {
    let malformed = |reason: String| StagingError::ArchiveMalformed {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(archive_path)
        .map_err(|e| malformed(format!("failed to open archive: {}", e)))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| malformed(format!("failed to read archive: {}", e)))?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| malformed(format!("failed to read entry {}: {}", index, e)))?;

        let target = match entry.enclosed_name() {
            Some(name) => dest_dir.join(name),
            None => {
                warn!(entry = entry.name(), "skipping archive entry with unsafe path");
                continue;
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| StagingError::CreateDirFailed {
                path: target.clone(),
                reason: e.to_string(),
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StagingError::CreateDirFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let mut out = std::fs::File::create(&target).map_err(|e| StagingError::WriteFailed {
            path: target.clone(),
            reason: e.to_string(),
        })?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| malformed(format!("failed to extract {}: {}", target.display(), e)))?;

        extracted.push(target);
    }

    debug!(?archive_path, files = extracted.len(), "expanded archive");
    Ok(extracted)
}

/// Build an in-memory ZIP of every file below `dir`
///
/// Entry names are relative to `dir` and use `/` separators. Subdirectories
/// are included with their structure.
pub fn build_zip(dir: &Path) -> Result<Vec<u8>, StagingError> {
    let build_failed = |reason: String| StagingError::ArchiveBuildFailed {
        path: dir.to_path_buf(),
        reason,
    };

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| build_failed(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| build_failed(e.to_string()))?;
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|e| build_failed(e.to_string()))?;
        } else if entry.file_type().is_file() {
            let bytes = std::fs::read(entry.path())
                .map_err(|e| build_failed(format!("{}: {}", entry.path().display(), e)))?;
            writer
                .start_file(name, options)
                .map_err(|e| build_failed(e.to_string()))?;
            writer
                .write_all(&bytes)
                .map_err(|e| build_failed(e.to_string()))?;
        }
    }

    let cursor = writer.finish().map_err(|e| build_failed(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
