//! Protocol-client error types.

use thiserror::Error;

/// Errors raised on the chat side.
///
/// These never cross the protocol client's own boundary as `Err` — the
/// client converts them into a terminal [`ChatUpdate::Failed`] so one bad
/// turn cannot crash the conversation surface.
///
/// [`ChatUpdate::Failed`]: crate::chat::ChatUpdate::Failed
#[derive(Debug, Error)]
pub enum ChatError {
    /// Network failure reaching the relay.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Non-2xx relay response with a decoded error payload.
    #[error("Server error ({status}): code={code}, message={message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },
    /// A single malformed stream frame. Recovered, non-fatal to the stream.
    #[error("Malformed stream frame: {0}")]
    StreamFrame(String),
}
