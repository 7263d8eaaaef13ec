//! Conversation turn driver.
//!
//! Ties the streaming client to the two stores: each turn appends the
//! user message, mints an empty assistant message, streams updates into
//! it, and keeps the continuation token for the next turn. Failures are
//! appended into the transcript instead of clearing it.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::agent::build_node_context;
use crate::chat::client::{ChatUpdate, RequestPhase, StreamingClient};
use crate::chat::protocol::{ChatInputs, ChatRequest, ResponseMode};
use crate::store::{ChatStore, GraphStore, MessageRole};

/// Task discriminator for a regular conversational turn.
const TASK_CHAT: &str = "chat";
/// Task discriminator when thinking mode is on; these turns request a
/// blocking upstream completion through `response_mode`.
const TASK_THINKING: &str = "thinking";

const DEFAULT_USER: &str = "web-viewer-user";

pub struct ChatSession {
    client: StreamingClient,
    graph: Arc<GraphStore>,
    chat: Arc<ChatStore>,
    user: String,
    conversation_id: RwLock<String>,
}

impl ChatSession {
    pub fn new(client: StreamingClient, graph: Arc<GraphStore>, chat: Arc<ChatStore>) -> Self {
        ChatSession {
            client,
            graph,
            chat,
            user: DEFAULT_USER.to_string(),
            conversation_id: RwLock::new(String::new()),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Continuation token established by the last completed turn, if any.
    pub fn conversation_id(&self) -> Option<String> {
        let token = self.conversation_id.read();
        if token.is_empty() {
            None
        } else {
            Some(token.clone())
        }
    }

    /// Run one conversational turn about the loaded document.
    pub async fn send(&self, query: &str) -> RequestPhase {
        self.run_turn(query.to_string(), None).await
    }

    /// Run one turn scoped to a single node. The node's extracted context
    /// travels with the query so the assistant answers about that node.
    pub async fn send_about_node(&self, query: &str, node_id: &str) -> RequestPhase {
        let Some(document) = self.graph.document() else {
            self.chat
                .set_error(Some("Load a workflow document before chatting.".into()));
            return RequestPhase::Failed;
        };
        let Some(context) = build_node_context(&document, node_id) else {
            self.chat
                .set_error(Some(format!("Unknown node: {}", node_id)));
            return RequestPhase::Failed;
        };
        let context_json =
            serde_json::to_string_pretty(&context).unwrap_or_else(|_| "{}".to_string());
        let query = format!("{}\n\nNode context:\n{}", query, context_json);
        self.run_turn(query, Some(node_id.to_string())).await
    }

    async fn run_turn(&self, query: String, node_id: Option<String>) -> RequestPhase {
        let Some(document) = self.graph.document() else {
            self.chat
                .set_error(Some("Load a workflow document before chatting.".into()));
            return RequestPhase::Failed;
        };
        let yaml = match serde_yaml::to_string(&document) {
            Ok(yaml) => yaml,
            Err(e) => {
                self.chat
                    .set_error(Some(format!("Failed to serialize workflow: {}", e)));
                return RequestPhase::Failed;
            }
        };

        self.chat.set_error(None);
        self.chat.set_loading(true);
        match &node_id {
            Some(id) => self
                .chat
                .add_node_message(MessageRole::User, query.clone(), id.clone()),
            None => self.chat.add_message(MessageRole::User, query.clone()),
        };
        // Fresh empty assistant message; overlapping turns each stream
        // into their own id.
        let assistant_id = self.chat.add_message(MessageRole::Assistant, "");

        // `mode` stays "streaming" either way; thinking mode only asks the
        // upstream for a blocking completion via `response_mode`, and the
        // relay still delivers the result as an event stream.
        let thinking = self.chat.thinking_mode();
        let request = ChatRequest {
            inputs: ChatInputs {
                yaml,
                task: if thinking { TASK_THINKING } else { TASK_CHAT }.to_string(),
            },
            query,
            mode: ResponseMode::Streaming,
            conversation_id: self.conversation_id.read().clone(),
            user: self.user.clone(),
            response_mode: Some(if thinking {
                ResponseMode::Blocking
            } else {
                ResponseMode::Streaming
            }),
        };

        let (tx, mut rx) = mpsc::channel(32);
        let producer = async {
            let phase = self.client.send_chat(&request, &tx).await;
            drop(tx);
            phase
        };
        let consumer = async {
            while let Some(update) = rx.recv().await {
                match update {
                    ChatUpdate::Answer(full) => {
                        self.chat.update_message(&assistant_id, &full);
                    }
                    ChatUpdate::Complete { conversation_id } => {
                        if let Some(token) = conversation_id {
                            *self.conversation_id.write() = token;
                        }
                    }
                    ChatUpdate::Failed { message } => {
                        self.chat.set_error(Some(message.clone()));
                        self.chat
                            .update_message(&assistant_id, &format!("Error: {}", message));
                    }
                }
            }
        };
        let (phase, ()) = tokio::join!(producer, consumer);
        self.chat.set_loading(false);
        phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const SOURCE: &str = r#"
version: "0.1.0"
kind: app
app:
  name: session test
  mode: workflow
workflow:
  graph:
    nodes:
      - id: start_1
        data:
          type: start
          title: Start
    edges: []
"#;

    fn session(endpoint: &str) -> (ChatSession, Arc<GraphStore>, Arc<ChatStore>) {
        let graph = Arc::new(GraphStore::new());
        let chat = Arc::new(ChatStore::new());
        graph.load_source(SOURCE).unwrap();
        let session = ChatSession::new(
            StreamingClient::new(endpoint),
            Arc::clone(&graph),
            Arc::clone(&chat),
        );
        (session, graph, chat)
    }

    #[tokio::test]
    async fn test_turn_streams_into_assistant_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(
                "data: {\"event\":\"message\",\"answer\":\"It \"}\n\
                 data: {\"event\":\"message\",\"answer\":\"starts.\",\"conversation_id\":\"conv_1\"}\n\
                 data: [DONE]\n",
            )
            .create_async()
            .await;

        let (session, _, chat) = session(&format!("{}/api/chat", server.url()));
        let phase = session.send("what does this workflow do?").await;

        assert_eq!(phase, RequestPhase::Complete);
        assert_eq!(session.conversation_id().as_deref(), Some("conv_1"));
        assert!(!chat.is_loading());
        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "It starts.");
    }

    #[tokio::test]
    async fn test_continuation_token_sent_on_next_turn() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"conversation_id": ""}),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(
                "data: {\"event\":\"message_end\",\"conversation_id\":\"conv_9\"}\ndata: [DONE]\n",
            )
            .create_async()
            .await;
        let second = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"conversation_id": "conv_9"}),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: [DONE]\n")
            .create_async()
            .await;

        let (session, _, _) = session(&format!("{}/api/chat", server.url()));
        session.send("first").await;
        session.send("second").await;
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_failure_appends_error_without_clearing_history() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code":"provider_not_initialize","message":"no key"}"#)
            .create_async()
            .await;

        let (session, _, chat) = session(&format!("{}/api/chat", server.url()));
        chat.add_welcome_message("hello");
        let phase = session.send("break please").await;

        assert_eq!(phase, RequestPhase::Failed);
        assert!(chat.error().is_some());
        let messages = chat.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].is_welcome);
        assert!(messages[2].content.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_send_without_document_fails_fast() {
        let graph = Arc::new(GraphStore::new());
        let chat = Arc::new(ChatStore::new());
        let session = ChatSession::new(
            StreamingClient::new("http://127.0.0.1:9/api/chat"),
            graph,
            Arc::clone(&chat),
        );
        let phase = session.send("anything").await;
        assert_eq!(phase, RequestPhase::Failed);
        assert!(chat.error().unwrap().contains("Load a workflow document"));
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_thinking_mode_switches_task_and_response_mode() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({"mode": "streaming"})),
                Matcher::PartialJson(serde_json::json!({"response_mode": "blocking"})),
                Matcher::PartialJson(serde_json::json!({"inputs": {"type": "thinking"}})),
            ]))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: {\"event\":\"message\",\"answer\":\"deep\"}\ndata: [DONE]\n")
            .create_async()
            .await;

        let (session, _, chat) = session(&format!("{}/api/chat", server.url()));
        chat.toggle_thinking_mode();
        let phase = session.send("think about it").await;
        assert_eq!(phase, RequestPhase::Complete);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_node_scoped_turn_carries_context() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::Regex("Node context".into()))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: [DONE]\n")
            .create_async()
            .await;

        let (session, _, chat) = session(&format!("{}/api/chat", server.url()));
        let phase = session.send_about_node("explain this node", "start_1").await;
        assert_eq!(phase, RequestPhase::Complete);
        mock.assert_async().await;
        assert_eq!(chat.messages()[0].node_id.as_deref(), Some("start_1"));

        let phase = session.send_about_node("explain", "missing").await;
        assert_eq!(phase, RequestPhase::Failed);
        assert!(chat.error().unwrap().contains("Unknown node"));
    }
}
