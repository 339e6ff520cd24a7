//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Submission, cancellation and status
//! - [`files`] - Upload staging, result download and file removal
//! - [`system`] - Health and the event stream

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

mod files;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` works
pub use files::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /status/all
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StatusQuery {
    /// Only return tasks in this state (e.g. "running", "failed")
    pub state: Option<String>,
}

/// Query parameters for the /file routes
///
/// Every parameter may also be sent as a request header of the same name.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FileQuery {
    /// File name to stage or read back
    pub filename: Option<String>,
    /// Expand a ZIP upload into the upload area
    pub unzip: Option<String>,
}

/// Response body for requests that create a task or an upload area
#[derive(Debug, Deserialize, Serialize)]
pub struct IdResponse {
    /// The task or upload identifier
    pub id: crate::types::TaskId,
}

/// Header value for `name`, falling back to the query parameter
pub(crate) fn header_or_query(
    headers: &HeaderMap,
    name: &str,
    query_value: Option<&str>,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or(query_value)
        .map(str::to_string)
}

/// Parse a loose boolean flag ("true", "1", "yes", "on")
pub(crate) fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("filename", HeaderValue::from_static("from-header.txt"));

        assert_eq!(
            header_or_query(&headers, "filename", Some("from-query.txt")).as_deref(),
            Some("from-header.txt")
        );
    }

    #[test]
    fn query_used_when_header_missing_or_blank() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            header_or_query(&headers, "filename", Some("q.txt")).as_deref(),
            Some("q.txt")
        );

        headers.insert("filename", HeaderValue::from_static("  "));
        assert_eq!(
            header_or_query(&headers, "filename", Some("q.txt")).as_deref(),
            Some("q.txt")
        );
        assert_eq!(header_or_query(&HeaderMap::new(), "filename", None), None);
    }

    #[test]
    fn flags() {
        for on in ["true", "TRUE", "1", "yes", " on "] {
            assert!(parse_flag(Some(on)), "{on}");
        }
        for off in ["false", "0", "no", ""] {
            assert!(!parse_flag(Some(off)), "{off}");
        }
        assert!(!parse_flag(None));
    }
}
