//! Conversational assistant plumbing: wire protocol, streaming client,
//! and the turn driver tying it to the stores.

mod client;
mod protocol;
mod session;

pub use client::{ChatUpdate, RequestPhase, StreamingClient};
pub use protocol::{
    map_server_error, parse_frame, ChatInputs, ChatRequest, FrameBuffer, FrameOutcome,
    ResponseMode, StreamEvent,
};
pub use session::ChatSession;
