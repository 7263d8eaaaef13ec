//! Conversation state.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set when the message is scoped to one node of the graph.
    pub node_id: Option<String>,
    pub is_welcome: bool,
}

#[derive(Debug, Default)]
struct ChatState {
    messages: Vec<ConversationMessage>,
    loading: bool,
    error: Option<String>,
    thinking_mode: bool,
}

/// Append-only message log plus the transient request flags around it.
#[derive(Debug, Default)]
pub struct ChatStore {
    state: RwLock<ChatState>,
}

impl ChatStore {
    pub fn new() -> Self {
        ChatStore::default()
    }

    /// Append a message and return its generated id.
    pub fn add_message(&self, role: MessageRole, content: impl Into<String>) -> String {
        self.push(role, content.into(), None, false)
    }

    /// Append a message tied to a specific graph node.
    pub fn add_node_message(
        &self,
        role: MessageRole,
        content: impl Into<String>,
        node_id: impl Into<String>,
    ) -> String {
        self.push(role, content.into(), Some(node_id.into()), false)
    }

    /// Append the assistant greeting shown before the first user turn.
    pub fn add_welcome_message(&self, content: impl Into<String>) -> String {
        self.push(MessageRole::Assistant, content.into(), None, true)
    }

    fn push(
        &self,
        role: MessageRole,
        content: String,
        node_id: Option<String>,
        is_welcome: bool,
    ) -> String {
        let id = format!("msg_{}", Uuid::new_v4());
        self.state.write().messages.push(ConversationMessage {
            id: id.clone(),
            role,
            content,
            timestamp: Utc::now(),
            node_id,
            is_welcome,
        });
        id
    }

    /// Overwrite the content of an existing message in place. Returns
    /// false when no message carries `id`.
    pub fn update_message(&self, id: &str, content: &str) -> bool {
        let mut state = self.state.write();
        match state.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.to_string();
                true
            }
            None => false,
        }
    }

    /// Drop every message and reset the request flags in one step.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.messages.clear();
        state.loading = false;
        state.error = None;
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.write().loading = loading;
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.write().error = error;
    }

    pub fn toggle_thinking_mode(&self) -> bool {
        let mut state = self.state.write();
        state.thinking_mode = !state.thinking_mode;
        state.thinking_mode
    }

    pub fn thinking_mode(&self) -> bool {
        self.state.read().thinking_mode
    }

    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.state.read().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }
}
