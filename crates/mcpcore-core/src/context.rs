//! Per-request context threaded through the dispatch core, handlers, and
//! middleware.

use std::sync::Arc;
use std::time::Instant;

use mcpcore_protocol::{JsonRpcNotification, Meta, RequestId};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::session::Session;

/// Which transport a request arrived on; informs handlers that need to
/// behave differently per-channel (rare, but e.g. progress streaming is only
/// meaningful where the transport can push).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    StreamableHttp,
    Sse,
}

/// A handle a tool handler can use to emit `notifications/progress` events
/// tagged with the caller's progress token, if one was supplied.
#[derive(Clone)]
pub struct ProgressReporter {
    session: Arc<Session>,
    token: Option<serde_json::Value>,
}

impl ProgressReporter {
    pub fn report(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        let Some(token) = &self.token else {
            return;
        };
        let mut payload = json!({
            "progressToken": token,
            "progress": progress,
        });
        if let Some(total) = total {
            payload["total"] = json!(total);
        }
        if let Some(message) = message {
            payload["message"] = json!(message);
        }
        self.session
            .notify(JsonRpcNotification::new(mcpcore_protocol::methods::PROGRESS, Some(payload)));
    }
}

/// Everything a handler needs to know about the request it is serving.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub transport: TransportKind,
    pub session: Arc<Session>,
    pub meta: Option<Meta>,
    pub auth: Option<String>,
    cancellation: CancellationToken,
    started: Instant,
}

impl RequestContext {
    pub fn new(
        request_id: RequestId,
        transport: TransportKind,
        session: Arc<Session>,
        meta: Option<Meta>,
    ) -> Self {
        let cancellation = session.register_canceler(request_id.clone());
        Self {
            request_id,
            transport,
            session,
            meta,
            auth: None,
            cancellation,
            started: Instant::now(),
        }
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    pub fn progress_reporter(&self) -> ProgressReporter {
        ProgressReporter {
            session: self.session.clone(),
            token: self
                .meta
                .as_ref()
                .and_then(|m| m.progress_token())
                .cloned(),
        }
    }

    /// Called on every exit path (success, handler error, or cancellation) to
    /// deregister this request's canceler. Must be invoked exactly once.
    pub fn finish(&self) {
        self.session.deregister_canceler(&self.request_id);
    }
}
