//! Minimal MCP server: one `echo` tool, served over stdio, dual-endpoint
//! SSE, or streamable HTTP depending on `--transport`.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use mcpcore_core::{RequestContext, TransportKind};
use mcpcore_protocol::JsonRpcMessage;
use mcpcore_server::{CallToolResult, ContentBlock, McpServer, ServerBuilder, ToolDescriptor, ToolHandler};
use mcpcore_transport_http::{streamable_router, StreamableHttpConfig};
use mcpcore_transport_sse::{dual_endpoint_router, SseTransportConfig};
use mcpcore_transport_stdio::StdioTransport;
use mcpcore_transport_traits::{Transport, TransportMessage};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TransportArg {
    Stdio,
    Sse,
    Http,
}

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, value_enum, default_value_t = TransportArg::Stdio)]
    transport: TransportArg,

    /// Address to bind for the sse/http transports.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

fn echo_tool() -> (ToolDescriptor, Arc<dyn ToolHandler>) {
    let descriptor = ToolDescriptor {
        name: "echo".to_string(),
        description: Some("Echoes the provided message back".to_string()),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"],
        }),
        annotations: None,
    };
    let handler: Arc<dyn ToolHandler> = Arc::new(|_ctx: RequestContext, args: serde_json::Value| async move {
        let message = args.get("message").and_then(|v| v.as_str()).unwrap_or_default();
        Ok(CallToolResult::success(vec![ContentBlock::text(message)]))
    });
    (descriptor, handler)
}

fn build_server() -> Arc<McpServer> {
    let (descriptor, handler) = echo_tool();
    Arc::new(
        ServerBuilder::new("echo-server", env!("CARGO_PKG_VERSION"))
            .tool(descriptor, handler)
            .build(),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout is the wire for the stdio transport; logs must go to stderr
    // there or they'd corrupt the JSON-RPC stream.
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match cli.transport {
        TransportArg::Stdio => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
        TransportArg::Sse | TransportArg::Http => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    let server = build_server();

    match cli.transport {
        TransportArg::Stdio => run_stdio(server).await?,
        TransportArg::Sse => run_sse(server, cli.addr).await?,
        TransportArg::Http => run_http(server, cli.addr).await?,
    }

    Ok(())
}

/// A peer message carrying the result of a server-initiated request (e.g.
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

async fn run_stdio(server: Arc<McpServer>) -> Result<(), Box<dyn std::error::Error>> {
    let transport = Arc::new(StdioTransport::new());
    transport.connect().await?;

    let session = server.sessions.create();

    if let Some(mut notifications) = session.take_notification_receiver() {
        let notify_transport = transport.clone();
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                let outbound = TransportMessage::new(JsonRpcMessage::Notification(notification));
                if let Err(e) = notify_transport.send(outbound).await {
                    warn!(error = %e, "failed to deliver notification over stdio");
                    break;
                }
            }
        });
    }

    info!("echo-server listening on stdio");
    loop {
        let Some(inbound) = transport.receive().await? else {
            break;
        };
        match inbound.message {
            JsonRpcMessage::Request(request) => {
                let response = server.handle(&session, TransportKind::Stdio, request).await;
                transport.send(TransportMessage::new(JsonRpcMessage::Response(response))).await?;
            }
            JsonRpcMessage::RequestBatch(batch) => {
                let responses = server.handle_batch(&session, TransportKind::Stdio, batch).await;
                transport.send(TransportMessage::new(JsonRpcMessage::ResponseBatch(responses))).await?;
            }
            JsonRpcMessage::Notification(notification) => {
                server.handle_notification(&session, notification);
            }
            JsonRpcMessage::Response(response) => {
                resolve_outbound_response(&server, response);
            }
            JsonRpcMessage::ResponseBatch(batch) => {
                for response in batch.items {
                    resolve_outbound_response(&server, response);
                }
            }
        }
    }

    transport.disconnect().await?;
    Ok(())
}

async fn run_sse(server: Arc<McpServer>, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let router = dual_endpoint_router(server, SseTransportConfig::default());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "echo-server listening (dual-endpoint SSE)");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn run_http(server: Arc<McpServer>, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let router = streamable_router(server, StreamableHttpConfig::default());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "echo-server listening (streamable HTTP)");
    axum::serve(listener, router).await?;
    Ok(())
}
