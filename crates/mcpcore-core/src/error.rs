//! Session and context-level error taxonomy.

/// Errors produced by the session store and request context, independent of
/// any particular transport or dispatch concern.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("session '{0}' already initialized")]
    AlreadyInitialized(String),

    #[error("this operation requires a stateful session, but the server is running in stateless mode")]
    StatelessMode,

    #[error("request '{0}' is not cancelable")]
    NotCancelable(String),

    #[error("outbound request '{0}' timed out after {timeout_ms}ms", timeout_ms = .1)]
    Timeout(String, u64),

    #[error("session was terminated while an outbound request to it was pending")]
    SessionLost,

    #[error("notification channel for session '{0}' is closed")]
    ChannelClosed(String),

    #[error(transparent)]
    Codec(#[from] mcpcore_protocol::CodecError),
}

pub type McpResult<T> = Result<T, McpError>;
