//! Streamable HTTP transport (§4.8.1): one path serving POST/GET/DELETE per
//! the 2025-03-26 streamable HTTP transport shape, with an optional POST-SSE
//! upgrade for requests that want a streamed response.

mod error;
mod server;

pub use error::HttpTransportError;
pub use mcpcore_transport_sse::SseOutboundSender as HttpOutboundSender;
pub use server::{streamable_router, streamable_state, StreamableHttpConfig, MCP_SESSION_ID};
