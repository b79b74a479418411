//! Response types for the gitback MCP tools
//!
//! Successful calls return the analysis or ranking as JSON. Failed calls
//! return an [`ErrorResponse`] envelope:
//!
//! ```json
//! {
//!   "error": "Repository not found",
//!   "code": "NOT_FOUND",
//!   "details": "repository octo/missing not found"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalyzeError, ErrorKind};
use crate::storage::RepoSummary;

/// Error envelope returned by every tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable message, safe to show to end users
    pub error: String,

    /// Machine readable code, e.g. `VALIDATION_ERROR`
    pub code: String,

    /// Extra context; never set for internal failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            code: kind.code().to_string(),
            details,
        }
    }

    /// Envelope for a failed analysis
    ///
    /// Internal and cancelled failures carry only a generic message; their
    /// causes stay in the server logs.
    pub fn from_analyze_error(err: &AnalyzeError) -> Self {
        let kind = err.kind();
        let details = match kind {
            ErrorKind::Internal | ErrorKind::Cancelled => None,
            _ => Some(err.to_string()),
        };
        Self::new(kind, err.public_message(), details)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"failed to encode error response","code":"{}"}}"#,
                ErrorKind::Internal.code()
            )
        })
    }
}

/// Response for the top_repositories tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRepositoriesResponse {
    pub repositories: Vec<RepoSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::error::{AcquireError, ValidationError};

    #[test]
    fn test_validation_error_envelope() {
        let err = AnalyzeError::Validation(ValidationError::UnsafeCharacters("username"));
        let response = ErrorResponse::from_analyze_error(&err);

        assert_eq!(response.code, "VALIDATION_ERROR");
        assert_eq!(response.error, "invalid characters in username");
        assert!(response.details.is_some());
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = AnalyzeError::Acquire(AcquireError::Git {
            command: "clone",
            details: "/tmp/gitback-analysis-x: disk full".to_string(),
        });
        let response = ErrorResponse::from_analyze_error(&err);

        assert_eq!(response.code, "INTERNAL_ERROR");
        assert_eq!(response.details, None);
        assert!(!response.to_json().contains("disk full"));
    }
}
