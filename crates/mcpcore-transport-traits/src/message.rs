//! The message envelope transports hand to and receive from the core.

use mcpcore_protocol::JsonRpcMessage;

/// A framed message plus whatever addressing the transport needs to route
/// the reply back (a session ID for HTTP/SSE, nothing extra for stdio's
/// singleton session).
#[derive(Clone, Debug)]
pub struct TransportMessage {
    pub message: JsonRpcMessage,
    pub session_id: Option<String>,
}

impl TransportMessage {
    pub fn new(message: JsonRpcMessage) -> Self {
        Self { message, session_id: None }
    }

    pub fn with_session(message: JsonRpcMessage, session_id: impl Into<String>) -> Self {
        Self { message, session_id: Some(session_id.into()) }
    }
}
