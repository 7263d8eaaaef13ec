//! Error types for the viewer core.
//!
//! - [`DocumentError`] — Errors raised while parsing and normalizing a workflow document.
//! - [`ChatError`] — Errors raised by the streaming protocol client.

pub mod chat_error;
pub mod document_error;

pub use chat_error::ChatError;
pub use document_error::DocumentError;

/// Convenience alias for document-side results.
pub type DocumentResult<T> = Result<T, DocumentError>;
