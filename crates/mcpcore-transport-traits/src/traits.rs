//! The common transport contract (§4.8): deliver a framed message in,
//! deliver a framed message out, report a connection state.

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::error::TransportResult;
use crate::message::TransportMessage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportType {
    Stdio,
    StreamableHttp,
    Sse,
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn transport_type(&self) -> TransportType;

    fn state(&self) -> TransportState;

    async fn connect(&self) -> TransportResult<()>;

    async fn disconnect(&self) -> TransportResult<()>;

    /// Send one outbound message. Implementations serialize it to the wire
    /// immediately and flush.
    async fn send(&self, message: TransportMessage) -> TransportResult<()>;

    /// Receive the next inbound message, or `None` on orderly stream close.
    async fn receive(&self) -> TransportResult<Option<TransportMessage>>;

    fn configure(&self, config: TransportConfig);
}
