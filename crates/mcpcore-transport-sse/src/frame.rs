//! What travels over one SSE connection: either a notification forwarded
//! from the session's notification channel, or the response to a request
//! that arrived on the paired POST message endpoint.

use mcpcore_protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

use crate::sse_codec::SseEvent;

pub enum SseFrame {
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
    /// A server-initiated request (e.g. `roots/list`), pushed down the same
    /// channel as notifications and responses (§4.8.4).
    Request(JsonRpcRequest),
}

impl SseFrame {
    pub fn into_event(self) -> SseEvent {
        let data = match &self {
            Self::Notification(n) => serde_json::to_string(n),
            Self::Response(r) => serde_json::to_string(r),
            Self::Request(r) => serde_json::to_string(r),
        }
        .unwrap_or_else(|_| "{}".to_string());
        SseEvent::message(data)
    }
}
