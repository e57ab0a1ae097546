//! Dual-endpoint SSE transport: a GET endpoint that announces a message
//! endpoint and streams events, and a POST endpoint that accepts JSON-RPC
//! bodies and pushes their responses back over the paired GET stream (§4.8.2).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::{self, StreamExt};
use mcpcore_core::{SessionId, TransportKind};
use mcpcore_protocol::{parse_message, JsonRpcMessage};
use mcpcore_server::McpServer;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};
use tracing::warn;

use crate::connections::SseConnections;
use crate::frame::SseFrame;
use crate::guarded_stream::{Cleanup, GuardedStream};
use crate::sse_codec::{SseEncoder, SseEvent};

const CONNECTION_BUFFER: usize = 64;

#[derive(Clone)]
pub struct SseTransportConfig {
    pub message_path: String,
    pub keep_alive_interval: Duration,
}

impl Default for SseTransportConfig {
    fn default() -> Self {
        Self {
            message_path: "/message".to_string(),
            keep_alive_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
struct SseState {
    server: Arc<McpServer>,
    connections: Arc<SseConnections>,
    config: SseTransportConfig,
}

struct ConnectionGuard {
    connections: Arc<SseConnections>,
    server: Arc<McpServer>,
    session_id: SessionId,
}

impl Cleanup for ConnectionGuard {
    fn cleanup(&mut self) {
        self.connections.remove(&self.session_id);
        self.server.sessions.terminate(&self.session_id);
    }
}

/// Build the two-route axum `Router` for the dual-endpoint SSE transport,
/// plus the connection registry backing it. Keep the registry around to wire
/// up an [`crate::SseOutboundSender`] for server-initiated requests.
pub fn dual_endpoint_state(
    server: Arc<McpServer>,
    config: SseTransportConfig,
) -> (Router, Arc<SseConnections>) {
    let connections = Arc::new(SseConnections::new());
    let state = SseState {
        server,
        connections: connections.clone(),
        config,
    };
    let router = Router::new()
        .route(&state.config.message_path.clone(), post(message_handler))
        .route("/sse", get(sse_handler))
        .with_state(state);
    (router, connections)
}

/// Build the two-route axum `Router` for the dual-endpoint SSE transport.
/// Use [`dual_endpoint_state`] instead if server-initiated requests need to
/// reach connected clients.
pub fn dual_endpoint_router(server: Arc<McpServer>, config: SseTransportConfig) -> Router {
    dual_endpoint_state(server, config).0
}

async fn sse_handler(State(state): State<SseState>) -> impl IntoResponse {
    let session = state.server.sessions.create();

    let (tx, rx) = mpsc::channel::<SseFrame>(CONNECTION_BUFFER);
    state.connections.register(session.id.clone(), tx.clone());

    if let Some(mut notifications) = session.take_notification_receiver() {
        let forward_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                if forward_tx.send(SseFrame::Notification(notification)).await.is_err() {
                    break;
                }
            }
        });
    }

    let endpoint_event = SseEvent::builder()
        .event("endpoint")
        .data(format!("{}?sessionId={}", state.config.message_path, session.id))
        .try_build()
        .expect("data is always set");
    let announce = stream::once(async move {
        Ok::<_, Infallible>(Bytes::from(SseEncoder::encode_string(&endpoint_event)))
    });

    let frames = ReceiverStream::new(rx)
        .map(|frame| Ok::<_, Infallible>(Bytes::from(SseEncoder::encode_string(&frame.into_event()))));

    let keep_alive = IntervalStream::new(tokio::time::interval(state.config.keep_alive_interval))
        .map(|_| Ok::<_, Infallible>(Bytes::from(SseEncoder::encode_keepalive())));

    let body_stream = announce.chain(stream::select(frames, keep_alive));
    let guard = ConnectionGuard {
        connections: state.connections.clone(),
        server: state.server.clone(),
        session_id: session.id.clone(),
    };
    let guarded = GuardedStream::new(body_stream, guard);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(guarded))
        .expect("response with a streaming body is always constructible")
}

#[derive(Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn message_handler(
    State(state): State<SseState>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Response {
    let Ok(session_id) = SessionId::try_from_string(query.session_id) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some(session) = state.server.sessions.lookup(&session_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let message = match parse_message(&body) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "malformed message on SSE message endpoint");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match message {
        JsonRpcMessage::Request(request) => {
            let response = state.server.handle(&session, TransportKind::Sse, request).await;
            state
                .connections
                .push(&session.id, SseFrame::Response(response))
                .await;
            StatusCode::ACCEPTED.into_response()
        }
        JsonRpcMessage::RequestBatch(batch) => {
            let responses = state.server.handle_batch(&session, TransportKind::Sse, batch).await;
            for response in responses.items {
                state.connections.push(&session.id, SseFrame::Response(response)).await;
            }
            StatusCode::ACCEPTED.into_response()
        }
        JsonRpcMessage::Notification(notification) => {
            state.server.handle_notification(&session, notification);
            StatusCode::ACCEPTED.into_response()
        }
        JsonRpcMessage::Response(response) => {
            resolve_outbound_response(&state.server, response);
            StatusCode::ACCEPTED.into_response()
        }
        JsonRpcMessage::ResponseBatch(batch) => {
            for response in batch.items {
                resolve_outbound_response(&state.server, response);
            }
            StatusCode::ACCEPTED.into_response()
        }
    }
}

/// A client POST carrying the result of a server-initiated request (e.g.
/// `roots/list`) is matched against the pending-outbound table and does not
/// go through dispatch (§4.8.4). A response with no matching entry is a
/// late or duplicate delivery and is dropped with a warning.
fn resolve_outbound_response(server: &McpServer, response: mcpcore_protocol::JsonRpcResponse) {
    let Some(id) = response.id.0.clone() else {
        warn!("dropping response-shaped message with a null id");
        return;
    };
    if !server.outbound.resolve(&id, response.into_result()) {
        warn!(%id, "no pending outbound request matches this response");
    }
}
