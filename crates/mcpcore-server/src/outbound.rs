//! Server-to-client request correlation, shared by every transport (§4.8.4, §5).
//!
//! A single in-memory table maps an outbound request ID to a one-shot
//! channel. Transports deliver inbound messages that look like responses to
//! [`OutboundRequests::resolve`] instead of routing them through dispatch.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use mcpcore_core::{SessionId, TransportKind};
use mcpcore_protocol::{JsonRpcError, JsonRpcRequest, RequestId};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::warn;

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// A function that actually pushes an outbound request onto whatever
/// transport owns the target session (its SSE channel, its stdout stream).
#[async_trait::async_trait]
pub trait OutboundSender: Send + Sync {
    async fn send_to_session(
        &self,
        session_id: &SessionId,
        request: JsonRpcRequest,
    ) -> ServerResult<()>;
}

type PendingResult = Result<Value, JsonRpcError>;

struct PendingEntry {
    session_id: SessionId,
    sender: oneshot::Sender<PendingResult>,
}

/// The pending-outbound-request table. One instance per server.
pub struct OutboundRequests {
    next_id: AtomicI64,
    pending: DashMap<RequestId, PendingEntry>,
    timeout: Duration,
}

impl Default for OutboundRequests {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_TIMEOUT)
    }
}

impl OutboundRequests {
    pub fn new(timeout: Duration) -> Self {
        Self {
            next_id: AtomicI64::new(1),
            pending: DashMap::new(),
            timeout,
        }
    }

    fn allocate_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Send `method`/`params` to `session_id` via `sender`, and await the
    /// matching response (or a timeout, or the session vanishing).
    pub async fn send_request(
        &self,
        sender: &dyn OutboundSender,
        session_id: &SessionId,
        _transport: TransportKind,
        method: &str,
        params: Option<Value>,
    ) -> ServerResult<Value> {
        let id = self.allocate_id();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            id.clone(),
            PendingEntry { session_id: session_id.clone(), sender: tx },
        );

        let request = JsonRpcRequest::new(method, params, id.clone());
        if let Err(e) = sender.send_to_session(session_id, request).await {
            self.pending.remove(&id);
            return Err(e);
        }

        let outcome = timeout(self.timeout, rx).await;
        self.pending.remove(&id);

        match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(error))) => Err(ServerError::Internal(error.message)),
            Ok(Err(_recv_dropped)) => Err(ServerError::SessionLost),
            Err(_elapsed) => Err(ServerError::OutboundTimeout(self.timeout.as_millis() as u64)),
        }
    }

    /// Deliver a raw response to whichever outbound request it correlates
    /// with. Returns `false` if no such ID is pending (a late/duplicate
    /// response, logged and dropped by the caller).
    pub fn resolve(&self, id: &RequestId, result: PendingResult) -> bool {
        if let Some((_, entry)) = self.pending.remove(id) {
            if entry.sender.send(result).is_err() {
                warn!(%id, "outbound response arrived after the waiter gave up");
            }
            true
        } else {
            false
        }
    }

    /// Cancel every pending outbound request owned by `session_id`, e.g.
    /// because that session was terminated. Pending waiters observe a
    /// session-lost error because the sender is simply dropped; requests
    /// belonging to other sessions are untouched.
    pub fn cancel_all_for_session(&self, session_id: &SessionId) {
        self.pending.retain(|_, entry| &entry.session_id != session_id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
