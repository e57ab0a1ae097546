//! MCP runtime core: a JSON-RPC 2.0 engine, session model, capability
//! managers, and three transports (stdio, dual-endpoint SSE, streamable
//! HTTP) for building servers that speak the Model Context Protocol.
//!
//! This crate is a facade: it re-exports the lower-level `mcpcore-*` crates
//! so a server only needs one dependency.
//!
//! ```rust,ignore
//! use mcpcore::prelude::*;
//!
//! let server = ServerBuilder::new("demo", "0.1.0")
//!     .tool(descriptor, handler)
//!     .build();
//! ```

pub use mcpcore_protocol as protocol;
pub use mcpcore_core as core;
pub use mcpcore_server as server;
pub use mcpcore_transport_traits as transport;
pub use mcpcore_transport_stdio as stdio;
pub use mcpcore_transport_http as http;
pub use mcpcore_transport_sse as sse;

pub use async_trait::async_trait;
pub use tokio;
pub use tracing;

/// The types most servers need in scope, mirroring what the individual
/// `mcpcore-*` crates export at their own roots.
pub mod prelude {
    pub use mcpcore_core::{
        ProgressReporter, RequestContext, Session, SessionId, SessionMode, SessionState,
        SessionStore, TransportKind,
    };
    pub use mcpcore_protocol::{
        methods, JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification,
        JsonRpcRequest, JsonRpcResponse, RequestId,
    };
    pub use mcpcore_server::{
        CallToolResult, Capabilities, ClientInfo, ContentBlock, McpServer, OutboundSender,
        PromptDescriptor, PromptHandler, ResourceDescriptor, ResourceHandler,
        ResourceTemplateDescriptor, ResourceTemplateHandler, ServerBuilder, ServerError,
        ServerInfo, ServerResult, ToolDescriptor, ToolHandler,
    };
    pub use mcpcore_transport_http::{
        streamable_router, streamable_state, HttpOutboundSender, StreamableHttpConfig,
    };
    pub use mcpcore_transport_sse::{
        dual_endpoint_router, dual_endpoint_state, SseOutboundSender, SseTransportConfig,
    };
    pub use mcpcore_transport_stdio::{ChildProcessConfig, ChildProcessLauncher, StdioTransport};
    pub use mcpcore_transport_traits::{Transport, TransportConfig, TransportMessage};
}
