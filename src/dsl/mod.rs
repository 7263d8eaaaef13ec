//! Document ingestion: parse, validate, and normalize workflow exports.

mod normalizer;
mod parser;
pub mod schema;

pub use normalizer::LoadedDocument;
pub use schema::*;

use crate::error::DocumentError;

/// Parse and normalize raw document text (`.yaml` / `.yml`).
///
/// On success every optional field has received its documented default and
/// node/edge lists are sanitized (first occurrence wins on duplicate ids).
/// Failures come back as a typed [`DocumentError`], never a panic.
pub fn load_document(content: &str) -> Result<LoadedDocument, DocumentError> {
    let raw = parser::parse_raw(content)?;
    normalizer::normalize(raw)
}
