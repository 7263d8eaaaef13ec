//! Wire types for the relay protocol.
//!
//! The relay streams the upstream assistant's body back as newline-delimited
//! `data:`-prefixed frames. Parsing here is strict per frame but lenient per
//! stream: one malformed frame is an error the caller can skip, never a
//! reason to abort.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

// ================================
// Request payload
// ================================

/// Response delivery mode requested from the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Streaming,
    Blocking,
}

/// Structured inputs carried alongside the free-text query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInputs {
    /// The loaded document serialized back to YAML.
    pub yaml: String,
    /// Task discriminator for the upstream assistant.
    #[serde(rename = "type")]
    pub task: String,
}

/// One assistant request as accepted by the relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub inputs: ChatInputs,
    pub query: String,
    pub mode: ResponseMode,
    /// Continuation token; empty on the first turn.
    pub conversation_id: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,
}

// ================================
// Stream frames
// ================================

/// A decoded stream event, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// `message` / `agent_message`: append the fragment to the accumulator.
    Delta(String),
    /// `message_replace`: overwrite the accumulator wholesale.
    Replace(String),
    /// `message_end`: the turn's content is final.
    End,
    /// `error`: server-side failure for this turn.
    Error(String),
}

/// Outcome of parsing a single `data:` frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The literal `[DONE]` sentinel.
    Done,
    /// A decoded event. `event` is `None` for event kinds this client does
    /// not interpret; the continuation token still rides along on any frame.
    Event {
        event: Option<StreamEvent>,
        conversation_id: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    event: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
}

/// Parse one frame body (the text after the `data:` marker).
pub fn parse_frame(body: &str) -> Result<FrameOutcome, ChatError> {
    let body = body.trim();
    if body == "[DONE]" {
        return Ok(FrameOutcome::Done);
    }

    let raw: RawFrame = serde_json::from_str(body)
        .map_err(|e| ChatError::StreamFrame(format!("{}: {}", e, body)))?;

    let event = match raw.event.as_str() {
        "message" | "agent_message" => raw.answer.map(StreamEvent::Delta),
        "message_replace" => raw.answer.map(StreamEvent::Replace),
        "message_end" => Some(StreamEvent::End),
        "error" => Some(StreamEvent::Error(
            raw.message.unwrap_or_else(|| "Unknown error".to_string()),
        )),
        _ => None,
    };

    Ok(FrameOutcome::Event {
        event,
        conversation_id: raw.conversation_id,
    })
}

// ================================
// Line buffering
// ================================

/// Splits an incrementally-read byte stream into complete lines.
///
/// A trailing partial line (and any split UTF-8 sequence) is retained
/// across `push` calls, so no frame is ever split across reads.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one transport chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Drain the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=newline).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

// ================================
// Server error taxonomy
// ================================

/// Error payload shape relayed for non-2xx upstream responses.
#[derive(Debug, Default, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ServerErrorBody {
    /// Best-effort decode; an unparsable body degrades to its raw text.
    pub fn decode(text: &str) -> ServerErrorBody {
        serde_json::from_str(text).unwrap_or_else(|_| ServerErrorBody {
            code: String::new(),
            error: None,
            message: Some(text.to_string()),
            detail: None,
        })
    }

    pub fn message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.detail.clone())
            .unwrap_or_default()
    }
}

/// Synthesize the stable user-facing message for a failed relay response.
pub fn map_server_error(status: u16, code: &str, message: &str) -> String {
    match status {
        404 => "Conversation not found. Please start a new conversation.".to_string(),
        400 => map_bad_request(code, message),
        500 => "Internal server error occurred. Please try again later.".to_string(),
        _ => format!("An error occurred ({}): {}", status, message),
    }
}

fn map_bad_request(code: &str, message: &str) -> String {
    if code.contains("invalid_param") {
        if message.contains("Workflow not published") {
            "The workflow has not been published. Save it from the app editor first.".to_string()
        } else {
            format!("Invalid request: {}", message)
        }
    } else if code.contains("app_unavailable") {
        "App configuration is unavailable. Please contact an administrator.".to_string()
    } else if code.contains("provider_not_initialize") {
        "Model credentials are not configured. Please contact an administrator.".to_string()
    } else if code.contains("provider_quota_exceeded") {
        "Model call quota exceeded. Please try again later.".to_string()
    } else if code.contains("model_currently_not_support") {
        "The selected model is currently unavailable. Please choose another model.".to_string()
    } else if code.contains("completion_request_error") {
        "Text generation request failed. Please try again.".to_string()
    } else {
        format!("Request error: {}", message)
    }
}
