//! Transport-layer error taxonomy (§7: transport errors terminate the
//! affected session but never the whole server).

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("framing error: {0}")]
    Framing(String),

    #[error("message exceeds the configured size limit ({size} > {limit} bytes)")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] mcpcore_protocol::CodecError),

    #[error("unknown session '{0}'")]
    UnknownSession(String),

    #[error("{0}")]
    Other(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
