//! Exercises the streamable HTTP transport's POST/GET/DELETE handlers
//! through a real axum `Router`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mcpcore_server::{CallToolResult, ContentBlock, McpServer, ServerBuilder, ToolDescriptor, ToolHandler};
use mcpcore_transport_http::{streamable_router, StreamableHttpConfig, MCP_SESSION_ID};
use tower::ServiceExt;

fn echo_tool() -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    let descriptor = ToolDescriptor {
        name: "echo".to_string(),
        description: Some("Echoes its input back".to_string()),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"],
        }),
        annotations: None,
    };
    let handler: Arc<dyn ToolHandler> = Arc::new(
        |_ctx: mcpcore_core::RequestContext, args: serde_json::Value| async move {
            let message = args.get("message").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(CallToolResult::success(vec![ContentBlock::text(message)]))
        },
    );
    (descriptor, handler)
}

fn build_server() -> Arc<McpServer> {
    let (descriptor, handler) = echo_tool();
    Arc::new(ServerBuilder::new("test-server", "0.1.0").tool(descriptor, handler).build())
}

fn progress_tool() -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    let descriptor = ToolDescriptor {
        name: "progressing".to_string(),
        description: Some("Reports progress three times then finishes".to_string()),
        input_schema: serde_json::json!({"type": "object"}),
        annotations: None,
    };
    let handler: Arc<dyn ToolHandler> = Arc::new(
        |ctx: mcpcore_core::RequestContext, _args: serde_json::Value| async move {
            let reporter = ctx.progress_reporter();
            for step in 1..=3 {
                reporter.report(step as f64, Some(3.0), None);
            }
            Ok(CallToolResult::success(vec![ContentBlock::text("done")]))
        },
    );
    (descriptor, handler)
}

fn build_server_with_progress_tool() -> Arc<McpServer> {
    let (descriptor, handler) = progress_tool();
    Arc::new(ServerBuilder::new("test-server", "0.1.0").tool(descriptor, handler).build())
}

fn initialize_body() -> Body {
    Body::from(
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "clientInfo": {"name": "test-client", "version": "0.0.1"},
                "capabilities": {},
            }
        })
        .to_string(),
    )
}

#[tokio::test]
async fn initialize_over_post_allocates_a_session() {
    let router = streamable_router(build_server(), StreamableHttpConfig::default());
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(initialize_body())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let session_header = response.headers().get(&MCP_SESSION_ID).expect("session header present");
    assert!(session_header.to_str().unwrap().starts_with("mcp-"));
}

#[tokio::test]
async fn post_without_session_header_is_rejected_unless_initializing() {
    let router = streamable_router(build_server(), StreamableHttpConfig::default());
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"jsonrpc":"2.0","id":1,"method":"ping"}).to_string(),
        ))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_sse_upgrade_interleaves_progress_before_the_final_response() {
    let server = build_server_with_progress_tool();
    let router = streamable_router(server, StreamableHttpConfig::default());

    let init_request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(initialize_body())
        .unwrap();
    let init_response = router.clone().oneshot(init_request).await.unwrap();
    let session_id = init_response
        .headers()
        .get(&MCP_SESSION_ID)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let call_request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", "text/event-stream")
        .header("mcp-session-id", session_id)
        .body(Body::from(
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {
                    "name": "progressing",
                    "arguments": {},
                    "_meta": {"progressToken": "p1"},
                },
            })
            .to_string(),
        ))
        .unwrap();
    let response = router.oneshot(call_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let frames: Vec<serde_json::Value> = text
        .split("\n\n")
        .filter_map(|event| {
            let data: String = event
                .lines()
                .filter_map(|l| l.strip_prefix("data: "))
                .collect::<Vec<_>>()
                .join("\n");
            if data.is_empty() {
                None
            } else {
                Some(serde_json::from_str(&data).unwrap())
            }
        })
        .collect();

    assert_eq!(frames.len(), 4, "expected three progress frames plus the final response");
    for frame in &frames[..3] {
        assert_eq!(frame["method"], "notifications/progress");
        assert_eq!(frame["params"]["progressToken"], "p1");
    }
    assert_eq!(frames[3]["id"], 2);
    assert_eq!(frames[3]["result"]["content"][0]["text"], "done");
}

#[tokio::test]
async fn delete_terminates_a_known_session_and_404s_on_replay() {
    let server = build_server();
    let router = streamable_router(server.clone(), StreamableHttpConfig::default());

    let init_request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(initialize_body())
        .unwrap();
    let init_response = router.clone().oneshot(init_request).await.unwrap();
    let session_id = init_response
        .headers()
        .get(&MCP_SESSION_ID)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let delete_request = Request::builder()
        .method("DELETE")
        .uri("/mcp")
        .header("mcp-session-id", session_id.clone())
        .body(Body::empty())
        .unwrap();
    let delete_response = router.clone().oneshot(delete_request).await.unwrap();
    assert_eq!(delete_response.status(), StatusCode::NO_CONTENT);

    let second_delete = Request::builder()
        .method("DELETE")
        .uri("/mcp")
        .header("mcp-session-id", session_id)
        .body(Body::empty())
        .unwrap();
    let second_response = router.oneshot(second_delete).await.unwrap();
    assert_eq!(second_response.status(), StatusCode::NOT_FOUND);
}
