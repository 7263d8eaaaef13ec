//! Document-level error types.

use thiserror::Error;

/// Errors produced while ingesting a workflow document.
///
/// Every variant is returned as a value across the module boundary so the
/// caller can surface an inline message and stay on the upload step.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document parse error: {0}")]
    Parse(String),
    #[error("Unsupported DSL version: {found}, supported versions: {supported}")]
    UnsupportedVersion { found: String, supported: String },
    #[error("Schema error: {0}")]
    Schema(String),
}
