//! JSON-RPC 2.0 envelope types and codec shared by every transport and by the
//! dispatch core.

pub mod error;
pub mod jsonrpc;
pub mod meta;
pub mod request_id;

pub use error::{CodecError, JsonRpcError, JsonRpcErrorCode};
pub use jsonrpc::{
    parse_message, serialize_message, JsonRpcBatch, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, JsonRpcVersion,
};
pub use meta::{split_meta, Meta, META_KEY, PROGRESS_TOKEN_KEY};
pub use request_id::{RequestId, ResponseId};

/// Well-known MCP method names the dispatch core recognizes.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const CANCELLED: &str = "notifications/cancelled";
    pub const PROGRESS: &str = "notifications/progress";

    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";

    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";
    pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";
    pub const RESOURCES_UPDATED: &str = "notifications/resources/updated";

    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";

    pub const COMPLETION_COMPLETE: &str = "completion/complete";

    pub const ROOTS_LIST: &str = "roots/list";
    pub const ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";
}
