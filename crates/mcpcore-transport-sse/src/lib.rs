//! Dual-endpoint SSE transport (§4.8.2): a long-lived GET stream paired with
//! a POST endpoint for client-to-server messages, bridged through a
//! per-session connection registry.

mod connections;
mod frame;
mod guarded_stream;
mod outbound_sender;
mod server;
mod sse_codec;

pub use connections::SseConnections;
pub use frame::SseFrame;
pub use guarded_stream::{Cleanup, GuardedStream};
pub use outbound_sender::SseOutboundSender;
pub use server::{dual_endpoint_router, dual_endpoint_state, SseTransportConfig};
pub use sse_codec::{SseEncoder, SseEvent, SseEventBuilder};
