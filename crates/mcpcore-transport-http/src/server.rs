//! Streamable HTTP transport (§4.8.1): one path serves POST (JSON-RPC in,
//! JSON or a one-shot SSE upgrade out), GET (long-lived SSE stream for
//! server-initiated messages), and DELETE (explicit session termination).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, StreamExt};
use mcpcore_core::{Session, SessionId, TransportKind};
use mcpcore_protocol::{
    methods, parse_message, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
use mcpcore_server::McpServer;
use mcpcore_transport_sse::{Cleanup, GuardedStream, SseConnections, SseEncoder, SseEvent, SseFrame};
use mcpcore_transport_traits::TransportConfig;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};

use crate::error::HttpTransportError;

const CONNECTION_BUFFER: usize = 64;

impl IntoResponse for HttpTransportError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingSessionHeader => StatusCode::BAD_REQUEST,
            Self::UnknownSession => StatusCode::NOT_FOUND,
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// The MCP streamable HTTP session header, carried on every request after
/// the initializing response has returned it.
pub static MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");

#[derive(Clone)]
pub struct StreamableHttpConfig {
    pub path: String,
    pub transport: TransportConfig,
}

impl Default for StreamableHttpConfig {
    fn default() -> Self {
        Self { path: "/mcp".to_string(), transport: TransportConfig::default() }
    }
}

#[derive(Clone)]
struct HttpState {
    server: Arc<McpServer>,
    connections: Arc<SseConnections>,
    config: StreamableHttpConfig,
}

struct ConnectionGuard {
    connections: Arc<SseConnections>,
    session_id: SessionId,
}

impl Cleanup for ConnectionGuard {
    fn cleanup(&mut self) {
        self.connections.remove(&self.session_id);
    }
}

/// Build the single-path axum `Router` for the streamable HTTP transport,
/// plus the connection registry backing its GET-SSE stream. Keep the
/// registry around to wire up an [`crate::HttpOutboundSender`] for
/// server-initiated requests.
pub fn streamable_state(
    server: Arc<McpServer>,
    config: StreamableHttpConfig,
) -> (Router, Arc<SseConnections>) {
    let connections = Arc::new(SseConnections::new());
    let state = HttpState { server, connections: connections.clone(), config: config.clone() };
    let router = Router::new()
        .route(&config.path, get(get_handler).post(post_handler).delete(delete_handler))
        .with_state(state);
    (router, connections)
}

/// Build the single-path axum `Router` for the streamable HTTP transport.
/// Use [`streamable_state`] instead if server-initiated requests need to
/// reach connected clients.
pub fn streamable_router(server: Arc<McpServer>, config: StreamableHttpConfig) -> Router {
    streamable_state(server, config).0
}

fn session_header(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get(&MCP_SESSION_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| SessionId::try_from_string(s).ok())
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

async fn get_handler(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_header(&headers) else {
        return HttpTransportError::MissingSessionHeader.into_response();
    };
    let Some(session) = state.server.sessions.lookup(&session_id) else {
        return HttpTransportError::UnknownSession.into_response();
    };
    let Some(mut notifications) = session.take_notification_receiver() else {
        return StatusCode::CONFLICT.into_response();
    };

    let (tx, rx) = mpsc::channel::<SseFrame>(CONNECTION_BUFFER);
    state.connections.register(session.id.clone(), tx.clone());
    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            if tx.send(SseFrame::Notification(notification)).await.is_err() {
                break;
            }
        }
    });

    let keep_alive_interval = state.config.transport.keep_alive_interval;
    let events = ReceiverStream::new(rx)
        .map(|frame| SseEncoder::encode_string(&frame.into_event()));

    let keep_alive = IntervalStream::new(tokio::time::interval(keep_alive_interval))
        .map(|_| SseEncoder::encode_keepalive());

    let body = stream::select(events, keep_alive)
        .map(|chunk| Ok::<_, std::convert::Infallible>(Bytes::from(chunk)));

    let guard = ConnectionGuard { connections: state.connections.clone(), session_id: session.id.clone() };
    let guarded = GuardedStream::new(body, guard);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(axum::body::Body::from_stream(guarded))
        .expect("response with a streaming body is always constructible")
}

async fn post_handler(State(state): State<HttpState>, headers: HeaderMap, body: Bytes) -> Response {
    if body.len() > state.config.transport.max_message_size {
        return HttpTransportError::BodyTooLarge { max: state.config.transport.max_message_size }
            .into_response();
    }

    let message = match parse_message(&body) {
        Ok(m) => m,
        Err(e) => return HttpTransportError::MalformedBody(e.to_string()).into_response(),
    };

    let existing_session = session_header(&headers).and_then(|id| state.server.sessions.lookup(&id));
    let is_initialize = matches!(&message, JsonRpcMessage::Request(r) if r.method == methods::INITIALIZE);

    let session = match (existing_session, is_initialize) {
        (Some(session), _) => session,
        (None, true) => state.server.sessions.create(),
        (None, false) => return HttpTransportError::MissingSessionHeader.into_response(),
    };

    match message {
        JsonRpcMessage::Request(request) => {
            if wants_event_stream(&headers) {
                handle_as_progress_stream(state, session, request).await
            } else {
                let response = state.server.handle(&session, TransportKind::StreamableHttp, request).await;
                respond_with(&session, &headers, vec![response])
            }
        }
        JsonRpcMessage::RequestBatch(batch) => {
            let responses = state
                .server
                .handle_batch(&session, TransportKind::StreamableHttp, batch)
                .await;
            respond_with(&session, &headers, responses.items)
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

/// POST-SSE upgrade path for a single request (§4.8.1, §8 scenario 3): the
/// response body is an event-stream carrying `notifications/progress`
/// frames interleaved with the handler's execution, followed by the final
/// response frame with the original request's ID, then end-of-stream.
async fn handle_as_progress_stream(
    state: HttpState,
    session: Arc<Session>,
    request: JsonRpcRequest,
) -> Response {
    let (tx, rx) = mpsc::channel::<SseFrame>(CONNECTION_BUFFER);
    let notifications = session.take_notification_receiver();
    let session_id = session.id.to_string();

    tokio::spawn(stream_one_request(state.server.clone(), session, request, notifications, tx));

    let body = ReceiverStream::new(rx)
        .map(|frame| Ok::<_, std::convert::Infallible>(Bytes::from(SseEncoder::encode_string(&frame.into_event()))));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(&MCP_SESSION_ID, session_id)
        .body(axum::body::Body::from_stream(body))
        .expect("response with a streaming body is always constructible")
}

/// Drains `notifications` into `tx` as progress frames while `request` runs,
/// then sends the final response frame and drops `tx`, ending the stream. If
/// the session's notification receiver was already taken elsewhere (e.g. a
/// concurrent GET-SSE stream holds it), the handler still runs to completion
/// and only the final response frame is emitted.
///
/// A handler that reports progress without ever yielding between calls (no
/// intervening `.await`) enqueues every notification during the single poll
/// that resolves the handler future, so the `select!` below can observe the
/// handler as ready before ever observing the channel as non-empty. The
/// drain after the loop catches exactly that case; without it, a
/// fully-synchronous progress burst would race and could be dropped.
async fn stream_one_request(
    server: Arc<McpServer>,
    session: Arc<Session>,
    request: JsonRpcRequest,
    mut notifications: Option<mpsc::Receiver<JsonRpcNotification>>,
    tx: mpsc::Sender<SseFrame>,
) {
    let handler = server.handle(&session, TransportKind::StreamableHttp, request);
    futures::pin_mut!(handler);

    let response = loop {
        let Some(rx_notif) = notifications.as_mut() else {
            break (&mut handler).await;
        };
        tokio::select! {
            response = &mut handler => break response,
            notification = rx_notif.recv() => match notification {
                Some(n) => {
                    if tx.send(SseFrame::Notification(n)).await.is_err() {
                        return;
                    }
                }
                None => notifications = None,
            },
        }
    };

    if let Some(rx_notif) = notifications.as_mut() {
        while let Ok(n) = rx_notif.try_recv() {
            if tx.send(SseFrame::Notification(n)).await.is_err() {
                return;
            }
        }
    }

    let _ = tx.send(SseFrame::Response(response)).await;
}

/// A client POST carrying the result of a server-initiated request (e.g.
/// `roots/list`) is matched against the pending-outbound table and does not
/// go through dispatch (§4.8.4). A response with no matching entry is a
/// late or duplicate delivery and is dropped with a warning.
fn resolve_outbound_response(server: &McpServer, response: JsonRpcResponse) {
    let Some(id) = response.id.0.clone() else {
        tracing::warn!("dropping response-shaped message with a null id");
        return;
    };
    if !server.outbound.resolve(&id, response.into_result()) {
        tracing::warn!(%id, "no pending outbound request matches this response");
    }
}

fn respond_with(
    session: &Arc<mcpcore_core::Session>,
    headers: &HeaderMap,
    responses: Vec<JsonRpcResponse>,
) -> Response {
    if wants_event_stream(headers) {
        let body: Vec<u8> = responses
            .into_iter()
            .flat_map(|r| {
                let data = serde_json::to_string(&r).unwrap_or_else(|_| "{}".to_string());
                SseEncoder::encode_string(&SseEvent::message(data)).into_bytes()
            })
            .collect();
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(&MCP_SESSION_ID, session.id.to_string())
            .body(axum::body::Body::from(body))
            .expect("response with a fixed body is always constructible")
    } else {
        let payload = if responses.len() == 1 {
            serde_json::to_value(&responses[0]).unwrap_or_default()
        } else {
            serde_json::to_value(&responses).unwrap_or_default()
        };
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .header(&MCP_SESSION_ID, session.id.to_string())
            .body(axum::body::Body::from(payload.to_string()))
            .expect("response with a fixed body is always constructible")
    }
}

async fn delete_handler(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_header(&headers) else {
        return HttpTransportError::MissingSessionHeader.into_response();
    };
    if state.server.sessions.terminate(&session_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        HttpTransportError::UnknownSession.into_response()
    }
}
