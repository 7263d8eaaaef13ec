//! Streaming protocol client.
//!
//! One request walks the phase machine
//! `Idle → Sending → Streaming → {Complete | Failed}`. Failures of any
//! shape surface as a terminal [`ChatUpdate::Failed`]; nothing escapes the
//! client as an `Err` or a panic, so one bad turn cannot take the
//! conversation surface down with it.

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::chat::protocol::{
    map_server_error, parse_frame, ChatRequest, FrameBuffer, FrameOutcome, ServerErrorBody,
    StreamEvent,
};
use crate::error::ChatError;

/// Phase of one request through the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Sending,
    Streaming,
    Complete,
    Failed,
}

/// Updates published while a request is in flight.
///
/// Exactly one terminal update (`Complete` or `Failed`) is sent per
/// request, always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    /// The full accumulator after a delta or replace frame.
    Answer(String),
    /// Stream finished; carries the latest continuation token.
    Complete { conversation_id: Option<String> },
    /// Terminal failure with a user-facing message.
    Failed { message: String },
}

/// Client for the credentialed relay endpoint.
///
/// No cancellation primitive is exposed: dropping the future returned by
/// [`send_chat`](Self::send_chat) drops the underlying response and closes
/// the connection.
#[derive(Debug, Clone)]
pub struct StreamingClient {
    http: reqwest::Client,
    endpoint: String,
}

impl StreamingClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        StreamingClient {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Send one assistant request and consume its event stream.
    ///
    /// Incremental updates are delivered through `updates` in arrival
    /// order; the returned phase is always `Complete` or `Failed` and
    /// matches the terminal update.
    pub async fn send_chat(
        &self,
        request: &ChatRequest,
        updates: &mpsc::Sender<ChatUpdate>,
    ) -> RequestPhase {
        match self.run(request, updates).await {
            Ok(conversation_id) => {
                tracing::debug!(?conversation_id, "chat request complete");
                let _ = updates
                    .send(ChatUpdate::Complete { conversation_id })
                    .await;
                RequestPhase::Complete
            }
            Err(message) => {
                tracing::warn!(%message, "chat request failed");
                let _ = updates.send(ChatUpdate::Failed { message }).await;
                RequestPhase::Failed
            }
        }
    }

    /// Drive the request to its terminal state. `Err` carries the already
    /// user-facing failure message.
    async fn run(
        &self,
        request: &ChatRequest,
        updates: &mpsc::Sender<ChatUpdate>,
    ) -> Result<Option<String>, String> {
        tracing::debug!(endpoint = %self.endpoint, phase = ?RequestPhase::Sending, "sending chat request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let err = ChatError::Transport(e.to_string());
                tracing::warn!(%err, "failed to reach relay");
                format!("A network error occurred: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = ServerErrorBody::decode(&text);
            let err = ChatError::Server {
                status: status.as_u16(),
                code: body.code.clone(),
                message: body.message(),
            };
            tracing::warn!(%err, "relay returned an error response");
            return Err(map_server_error(status.as_u16(), &body.code, &body.message()));
        }

        tracing::debug!(phase = ?RequestPhase::Streaming, "reading event stream");
        let mut stream = response.bytes_stream();
        let mut buffer = FrameBuffer::new();
        let mut accumulator = String::new();
        let mut conversation_id: Option<String> = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                let err = ChatError::Transport(e.to_string());
                tracing::warn!(%err, "stream read failed");
                format!("Streaming failed: {}", e)
            })?;
            buffer.push(&chunk);

            while let Some(line) = buffer.next_line() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Some(body) = line.strip_prefix("data:") else {
                    continue;
                };

                match parse_frame(body) {
                    Ok(FrameOutcome::Done) => return Ok(conversation_id),
                    Ok(FrameOutcome::Event {
                        event,
                        conversation_id: token,
                    }) => {
                        if token.is_some() {
                            conversation_id = token;
                        }
                        match event {
                            Some(StreamEvent::Delta(fragment)) => {
                                accumulator.push_str(&fragment);
                                let _ =
                                    updates.send(ChatUpdate::Answer(accumulator.clone())).await;
                            }
                            Some(StreamEvent::Replace(full)) => {
                                accumulator = full;
                                let _ =
                                    updates.send(ChatUpdate::Answer(accumulator.clone())).await;
                            }
                            Some(StreamEvent::End) | None => {}
                            Some(StreamEvent::Error(message)) => return Err(message),
                        }
                    }
                    // One bad frame never aborts the stream.
                    Err(e) => tracing::warn!(error = %e, "skipping malformed stream frame"),
                }
            }
        }

        Ok(conversation_id)
    }
}
