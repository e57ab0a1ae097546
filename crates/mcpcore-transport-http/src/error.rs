use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpTransportError {
    #[error("missing Mcp-Session-Id header")]
    MissingSessionHeader,
    #[error("unknown session")]
    UnknownSession,
    #[error("malformed JSON-RPC body: {0}")]
    MalformedBody(String),
    #[error("request body exceeds maximum size of {max} bytes")]
    BodyTooLarge { max: usize },
}
