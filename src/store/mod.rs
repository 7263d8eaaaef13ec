//! Viewer-facing state stores.

mod chat_store;
mod graph_store;

pub use chat_store::{ChatStore, ConversationMessage, MessageRole};
pub use graph_store::GraphStore;
