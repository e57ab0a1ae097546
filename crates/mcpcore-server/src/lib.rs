//! Dispatch core, lifecycle manager, capability registries, notification
//! fan-out, and server-to-client request correlation for the MCP runtime.

pub mod builder;
pub mod capabilities;
pub mod content;
pub mod error;
pub mod fanout;
pub mod lifecycle;
pub mod middleware;
pub mod outbound;
pub mod router;

pub use builder::{McpServer, ServerBuilder};
pub use capabilities::completion::{CompletionArgument, CompletionReference, CompletionResult};
pub use capabilities::prompt::{PromptArgument, PromptDescriptor, PromptHandler, PromptMessage};
pub use capabilities::resource::{
    ResourceDescriptor, ResourceHandler, ResourceTemplateDescriptor, ResourceTemplateHandler,
};
pub use capabilities::tool::{ToolAnnotations, ToolDescriptor, ToolHandler};
pub use capabilities::Capabilities;
pub use content::{CallToolResult, ContentBlock, ResourceContents};
pub use error::{ServerError, ServerResult};
pub use fanout::NotificationFanout;
pub use lifecycle::{ClientInfo, InitializeParams, InitializeResult, LifecycleManager, ServerInfo};
pub use outbound::{OutboundRequests, OutboundSender};
pub use router::{RequestRouter, RouterConfig};
