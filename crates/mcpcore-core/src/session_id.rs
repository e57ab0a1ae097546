//! Session identifiers.
//!
//! Session IDs are opaque, cryptographically random strings of the form
//! `mcp-<32 hex chars>` (128 bits of entropy), matching the shape the
//! streamable HTTP transport hands back to clients on the initialize reply.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum accepted length for a session ID received from a client, guarding
/// against unbounded allocation from a malicious `Mcp-Session-Id` header.
pub const MAX_SESSION_ID_LEN: usize = 256;

const PREFIX: &str = "mcp-";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes).expect("system RNG must be available");
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("{PREFIX}{hex}"))
    }

    /// Parse a session ID received over the wire, rejecting anything
    /// implausibly long before it is used as a map key.
    pub fn try_from_string(value: impl Into<String>) -> Result<Self, SessionIdError> {
        let value = value.into();
        if value.len() > MAX_SESSION_ID_LEN {
            return Err(SessionIdError::TooLong(value.len()));
        }
        if value.is_empty() {
            return Err(SessionIdError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionIdError {
    #[error("session id exceeds {MAX_SESSION_ID_LEN} bytes (got {0})")]
    TooLong(usize),
    #[error("session id must not be empty")]
    Empty,
}
