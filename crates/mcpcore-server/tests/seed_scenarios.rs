//! End-to-end seed scenarios exercised against `McpServer` directly, without
//! a concrete transport in the loop (transport-specific framing, e.g. the
//! POST-SSE streaming scenario, lives in the owning transport crate's own
//! `tests/`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcpcore_core::{RequestContext, Session, SessionId, TransportKind};
use mcpcore_protocol::{methods, JsonRpcRequest, RequestId};
use mcpcore_server::{
    CallToolResult, ContentBlock, McpServer, OutboundSender, ServerBuilder, ServerError,
    ServerResult, ToolAnnotations, ToolDescriptor, ToolHandler,
};
use serde_json::{json, Value};

fn init_request(id: i64) -> JsonRpcRequest {
    JsonRpcRequest::new(
        methods::INITIALIZE,
        Some(json!({
            "protocolVersion": "2025-03-26",
            "clientInfo": {"name": "C", "version": "1"},
            "capabilities": {}
        })),
        RequestId::Number(id),
    )
}

async fn handshake(server: &McpServer, session: &Arc<Session>) {
    let resp = server.handle(session, TransportKind::Stdio, init_request(1)).await;
    assert!(resp.is_success());
    server.handle_notification(
        session,
        mcpcore_protocol::JsonRpcNotification::new(methods::INITIALIZED, None),
    );
}

#[tokio::test]
async fn scenario_1_handshake_then_tools_list_succeeds() {
    let server = ServerBuilder::new("test", "0").build();
    let session = server.sessions.create();

    handshake(&server, &session).await;
    assert!(session.is_active());

    let resp = server
        .handle(&session, TransportKind::Stdio, JsonRpcRequest::new(methods::TOOLS_LIST, None, RequestId::Number(2)))
        .await;
    assert!(resp.is_success());
    assert_eq!(resp.result().unwrap()["tools"], json!([]));
}

struct GreetProbe {
    observed_meta: Arc<std::sync::Mutex<Option<Value>>>,
}

#[async_trait]
impl ToolHandler for GreetProbe {
    async fn call(&self, ctx: &RequestContext, args: Value) -> ServerResult<CallToolResult> {
        *self.observed_meta.lock().unwrap() = ctx
            .meta
            .as_ref()
            .and_then(|m| m.get("platform.auth/token"))
            .cloned();
        assert!(args.get("platform.auth/token").is_none(), "_meta leaked into arguments");
        let name = args["name"].as_str().unwrap_or("there");
        Ok(CallToolResult::success(vec![ContentBlock::text(format!("Hello, {name}!"))]))
    }
}

#[tokio::test]
async fn scenario_2_tool_round_trip_preserves_meta_without_leaking_into_arguments() {
    let observed = Arc::new(std::sync::Mutex::new(None));
    let handler: Arc<dyn ToolHandler> = Arc::new(GreetProbe { observed_meta: observed.clone() });
    let server = ServerBuilder::new("test", "0")
        .tool(
            ToolDescriptor {
                name: "greet".into(),
                description: None,
                input_schema: json!({
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"],
                }),
                annotations: Some(ToolAnnotations::default()),
            },
            handler,
        )
        .build();
    let session = server.sessions.create();
    handshake(&server, &session).await;

    let call = JsonRpcRequest::new(
        methods::TOOLS_CALL,
        Some(json!({
            "name": "greet",
            "arguments": {"name": "World"},
            "_meta": {"progressToken": "p1", "platform.auth/token": "abc"}
        })),
        RequestId::Number(3),
    );
    let resp = server.handle(&session, TransportKind::Stdio, call).await;
    assert!(resp.is_success());
    let result = resp.result().unwrap();
    assert_eq!(result["content"][0]["text"], "Hello, World!");
    assert_eq!(observed.lock().unwrap().clone().unwrap(), "abc");
}

struct RecordingSender {
    delivered: Arc<tokio::sync::Mutex<Vec<JsonRpcRequest>>>,
    known_sessions: Arc<std::sync::Mutex<std::collections::HashSet<SessionId>>>,
}

#[async_trait]
impl OutboundSender for RecordingSender {
    async fn send_to_session(&self, session_id: &SessionId, request: JsonRpcRequest) -> ServerResult<()> {
        if !self.known_sessions.lock().unwrap().contains(session_id) {
            return Err(ServerError::SessionLost);
        }
        self.delivered.lock().await.push(request);
        Ok(())
    }
}

#[tokio::test]
async fn scenario_4_server_to_client_roots_list_correlates_by_id() {
    let server = Arc::new(ServerBuilder::new("test", "0").build());
    let session = server.sessions.create();
    handshake(&server, &session).await;

    let delivered = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let known = Arc::new(std::sync::Mutex::new(std::collections::HashSet::from([session.id.clone()])));
    let sender = Arc::new(RecordingSender { delivered: delivered.clone(), known_sessions: known.clone() });

    let server2 = server.clone();
    let session2 = session.clone();
    let sender2 = sender.clone();
    let call = tokio::spawn(async move {
        server2
            .call_client(sender2.as_ref(), &session2, TransportKind::Stdio, methods::ROOTS_LIST, None)
            .await
    });

    loop {
        let guard = delivered.lock().await;
        if !guard.is_empty() {
            break;
        }
        drop(guard);
        tokio::task::yield_now().await;
    }
    let outbound_id = delivered.lock().await[0].id.clone();
    assert!(server.outbound.resolve(&outbound_id, Ok(json!({"roots": [{"uri": "file:///a"}]}))));

    let result = call.await.unwrap().unwrap();
    assert_eq!(result["roots"][0]["uri"], "file:///a");

    // A second call after the session vanishes is session-lost, not a timeout.
    known.lock().unwrap().clear();
    server.sessions.terminate(&session.id);
    let result = server
        .call_client(sender.as_ref(), &session, TransportKind::Stdio, methods::ROOTS_LIST, None)
        .await;
    assert!(matches!(result, Err(ServerError::SessionLost)));
}

struct CancelableTool {
    cancelled: Arc<AtomicBool>,
}

#[async_trait]
impl ToolHandler for CancelableTool {
    async fn call(&self, ctx: &RequestContext, _args: Value) -> ServerResult<CallToolResult> {
        let token = ctx.cancellation_token();
        tokio::select! {
            _ = token.cancelled() => {
                self.cancelled.store(true, Ordering::SeqCst);
                Ok(CallToolResult::error("cancelled"))
            }
            _ = tokio::time::sleep(Duration::from_secs(10)) => {
                Ok(CallToolResult::success(vec![ContentBlock::text("finished")]))
            }
        }
    }
}

#[tokio::test]
async fn scenario_5_cancellation_notification_unblocks_the_in_flight_handler() {
    let cancelled = Arc::new(AtomicBool::new(false));
    let handler: Arc<dyn ToolHandler> = Arc::new(CancelableTool { cancelled: cancelled.clone() });
    let server = Arc::new(
        ServerBuilder::new("test", "0")
            .tool(
                ToolDescriptor {
                    name: "slow".into(),
                    description: None,
                    input_schema: json!({"type": "object"}),
                    annotations: None,
                },
                handler,
            )
            .build(),
    );
    let session = server.sessions.create();
    handshake(&server, &session).await;

    let server2 = server.clone();
    let session2 = session.clone();
    let call = tokio::spawn(async move {
        server2
            .handle(
                &session2,
                TransportKind::Stdio,
                JsonRpcRequest::new(methods::TOOLS_CALL, Some(json!({"name": "slow"})), RequestId::Number(42)),
            )
            .await
    });

    // Give the handler a moment to register its canceler before cancelling.
    tokio::time::sleep(Duration::from_millis(20)).await;
    server.handle_notification(
        &session,
        mcpcore_protocol::JsonRpcNotification::new(
            methods::CANCELLED,
            Some(json!({"requestId": 42})),
        ),
    );

    let resp = tokio::time::timeout(Duration::from_millis(500), call).await.unwrap().unwrap();
    assert!(cancelled.load(Ordering::SeqCst));
    assert_eq!(resp.id, mcpcore_protocol::ResponseId::from(RequestId::Number(42)));
    assert!(resp.is_success());
    assert_eq!(resp.result().unwrap()["isError"], true);

    // Cancelling the initialize request's own ID is a silent no-op.
    server.handle_notification(
        &session,
        mcpcore_protocol::JsonRpcNotification::new(methods::CANCELLED, Some(json!({"requestId": 1}))),
    );
}

#[tokio::test]
async fn scenario_6_broadcast_under_stateless_mode_is_rejected_but_works_stateful() {
    let stateless = ServerBuilder::new("test", "0").stateless().build();
    let fanout = stateless.fanout();
    let result = fanout.broadcast(mcpcore_protocol::JsonRpcNotification::new("notifications/message", None));
    assert!(matches!(result, Err(ServerError::StatelessMode)));

    let stateful = ServerBuilder::new("test", "0").build();
    let s1 = stateful.sessions.create();
    let s2 = stateful.sessions.create();
    let s3 = stateful.sessions.create();
    s1.activate();
    s2.activate();
    s3.activate();
    let count = stateful
        .fanout()
        .broadcast(mcpcore_protocol::JsonRpcNotification::new("notifications/message", None))
        .unwrap();
    assert_eq!(count, 3);
}
