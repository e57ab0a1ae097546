//! `OutboundSender` for the dual-endpoint transport: a server-initiated
//! request is pushed down the session's GET-SSE stream as a `Request` frame,
//! the same channel notifications and responses already travel on.

use std::sync::Arc;

use async_trait::async_trait;
use mcpcore_core::SessionId;
use mcpcore_protocol::JsonRpcRequest;
use mcpcore_server::{ServerError, ServerResult};

use crate::connections::SseConnections;
use crate::frame::SseFrame;

pub struct SseOutboundSender {
    connections: Arc<SseConnections>,
}

impl SseOutboundSender {
    pub fn new(connections: Arc<SseConnections>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl mcpcore_server::OutboundSender for SseOutboundSender {
    async fn send_to_session(&self, session_id: &SessionId, request: JsonRpcRequest) -> ServerResult<()> {
        if self.connections.push(session_id, SseFrame::Request(request)).await {
            Ok(())
        } else {
            Err(ServerError::SessionLost)
        }
    }
}
