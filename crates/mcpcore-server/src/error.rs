//! Dispatch-layer error taxonomy.
//!
//! These are internal error kinds; `router::to_jsonrpc_error` maps each to
//! the wire-level JSON-RPC error code the client actually sees.

use mcpcore_protocol::JsonRpcError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServerError {
    #[error("method '{0}' not found")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("handler error: {message}")]
    Handler { message: String },

    #[error("the first request on a session must be 'initialize'")]
    NotInitialized,

    #[error("session already initialized")]
    AlreadyInitialized,

    #[error("tool '{0}' not found")]
    ToolNotFound(String),

    #[error("resource '{0}' not found")]
    ResourceNotFound(String),

    #[error("prompt '{0}' not found")]
    PromptNotFound(String),

    #[error("duplicate route registration for method '{0}'")]
    DuplicateRoute(String),

    #[error("this operation requires a stateful session")]
    StatelessMode,

    #[error("outbound request timed out after {0}ms")]
    OutboundTimeout(u64),

    #[error("session was lost while an outbound request was pending")]
    SessionLost,

    #[error("notification channel for session {0} is full")]
    NotificationChannelFull(String),

    #[error("notification channel for session {0} is closed")]
    NotificationChannelClosed(String),

    #[error(transparent)]
    Core(#[from] mcpcore_core::McpError),

    #[error(transparent)]
    Codec(#[from] mcpcore_protocol::CodecError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// Map to the JSON-RPC error object the client actually sees (§7).
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        use mcpcore_protocol::JsonRpcErrorCode::*;
        match self {
            Self::MethodNotFound(m) => JsonRpcError::method_not_found(m),
            Self::InvalidParams(reason) => {
                JsonRpcError::new(InvalidParams, Some(serde_json::json!(reason)))
            }
            Self::NotInitialized | Self::AlreadyInitialized => JsonRpcError::new(
                ApplicationError(-32000),
                Some(serde_json::json!(self.to_string())),
            ),
            Self::StatelessMode => JsonRpcError::new(
                ApplicationError(-32001),
                Some(serde_json::json!(self.to_string())),
            ),
            Self::OutboundTimeout(_) => JsonRpcError::new(
                ApplicationError(-32002),
                Some(serde_json::json!(self.to_string())),
            ),
            Self::SessionLost => JsonRpcError::new(
                ApplicationError(-32003),
                Some(serde_json::json!(self.to_string())),
            ),
            Self::NotificationChannelFull(_) | Self::NotificationChannelClosed(_) => JsonRpcError::new(
                ApplicationError(-32004),
                Some(serde_json::json!(self.to_string())),
            ),
            Self::ToolNotFound(_) | Self::ResourceNotFound(_) | Self::PromptNotFound(_) => {
                JsonRpcError::new(InvalidParams, Some(serde_json::json!(self.to_string())))
            }
            _ => JsonRpcError::internal_error(self.to_string()),
        }
    }
}
