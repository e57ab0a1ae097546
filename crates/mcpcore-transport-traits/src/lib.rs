//! Transport trait and message types shared by the stdio, streamable-HTTP,
//! and dual-endpoint SSE transports.

pub mod config;
pub mod error;
pub mod message;
pub mod traits;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use message::TransportMessage;
pub use traits::{Transport, TransportState, TransportType};
