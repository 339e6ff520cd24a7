//! Error types for jobhost
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (staging, engine, distribution, registry)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::TaskId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for jobhost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for jobhost
///
/// Errors raised synchronously (validation, lookups) are returned to the caller.
/// Errors raised inside a running task pipeline are never returned to the submitter;
/// they are recorded on the task handle and surface through status queries.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_tasks")
        key: Option<String>,
    },

    /// Missing or empty required input (job description, filename, payload)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown task or upload identifier
    #[error("not found: {0}")]
    NotFound(String),

    /// A non-terminal task already exists under this identifier
    #[error("task {id} already exists and is still running")]
    TaskAlreadyExists {
        /// The identifier that is already in use
        id: TaskId,
    },

    /// Disk or archive failure while staging files
    #[error("staging error: {0}")]
    Staging(#[from] StagingError),

    /// Failure reported by the processing engine
    #[error("engine error: {0}")]
    Engine(String),

    /// Failure reported by the distribution step
    #[error("distribution error: {0}")]
    Distribution(String),

    /// The operation observed a cancellation request
    #[error("task was cancelled")]
    Cancelled,

    /// The submission queue is at capacity
    #[error("task queue is full ({capacity} pending tasks)")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// External tool execution failed (engine executable)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (no engine configured, missing binary)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Staging store errors (upload landing zones and task working directories)
#[derive(Debug, Error)]
pub enum StagingError {
    /// Directory could not be created
    #[error("failed to create directory {path}: {reason}")]
    CreateDirFailed {
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// File could not be written
    #[error("failed to write {path}: {reason}")]
    WriteFailed {
        /// The file that could not be written
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// Uploaded archive could not be read or expanded
    #[error("malformed archive {archive}: {reason}")]
    ArchiveMalformed {
        /// The archive that failed to expand
        archive: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// Download bundle could not be built
    #[error("failed to build archive for {path}: {reason}")]
    ArchiveBuildFailed {
        /// The directory being bundled
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// File could not be copied into a working directory
    #[error("failed to copy {source_path} to {dest_path}: {reason}")]
    CopyFailed {
        /// The source file
        source_path: PathBuf,
        /// The destination file
        dest_path: PathBuf,
        /// The underlying reason
        reason: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "not found: task 7f0c...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "invalid request" error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict
            Error::TaskAlreadyExists { .. } => 409,
            Error::Cancelled => 409,

            // 422 Unprocessable Entity - upload could not be staged
            Error::Staging(StagingError::ArchiveMalformed { .. }) => 422,
            Error::Staging(_) => 500,

            // 502 Bad Gateway - external collaborator failures
            Error::Engine(_) => 502,
            Error::Distribution(_) => 502,

            // 503 Service Unavailable
            Error::QueueFull { .. } => 503,
            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,

            // 501 Not Implemented
            Error::NotSupported(_) => 501,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotFound(_) => "not_found",
            Error::TaskAlreadyExists { .. } => "task_already_exists",
            Error::Staging(e) => match e {
                StagingError::CreateDirFailed { .. } => "create_dir_failed",
                StagingError::WriteFailed { .. } => "write_failed",
                StagingError::ArchiveMalformed { .. } => "archive_malformed",
                StagingError::ArchiveBuildFailed { .. } => "archive_build_failed",
                StagingError::CopyFailed { .. } => "copy_failed",
            },
            Error::Engine(_) => "engine_error",
            Error::Distribution(_) => "distribution_error",
            Error::Cancelled => "cancelled",
            Error::QueueFull { .. } => "queue_full",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::TaskAlreadyExists { id } => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::QueueFull { capacity } => Some(serde_json::json!({
                "capacity": capacity,
            })),
            Error::Staging(StagingError::ArchiveMalformed { archive, .. }) => {
                Some(serde_json::json!({
                    "archive": archive,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
