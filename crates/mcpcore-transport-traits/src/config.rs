//! Transport configuration shared across stdio/HTTP/SSE (§6).

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Maximum accepted single-message size, in bytes.
    pub max_message_size: usize,
    /// SSE keep-alive comment interval.
    pub keep_alive_interval: Duration,
    /// Default outbound server-to-client request timeout.
    pub outbound_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_size: 10 * 1024 * 1024,
            keep_alive_interval: Duration::from_secs(30),
            outbound_timeout: Duration::from_secs(30),
        }
    }
}
