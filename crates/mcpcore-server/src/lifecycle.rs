//! Handshake and protocol-version negotiation (§4.4).

use mcpcore_core::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ServerError, ServerResult};

/// Versions this server understands, oldest first. The negotiation rule
/// (§4.4) picks the highest entry `<=` what the client advertised, falling
/// back to `versions[0]` when there is no overlap.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
    #[serde(default)]
    pub capabilities: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Pick the highest version we support that is `<=` the client's advertised
/// version; if no supported version qualifies, fall back to our lowest.
pub fn negotiate_version(client_version: &str) -> String {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .rev()
        .find(|v| v.as_bytes() <= client_version.as_bytes())
        .copied()
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
        .to_string()
}

/// A hook invoked once a session's `notifications/initialized` has landed.
pub type OnInitialized = Arc<dyn Fn(&Session) + Send + Sync>;

pub struct LifecycleManager {
    server_info: ServerInfo,
    capabilities: Value,
    instructions: Option<String>,
    on_initialized: parking_lot::RwLock<Vec<OnInitialized>>,
}

impl LifecycleManager {
    pub fn new(server_info: ServerInfo, capabilities: Value, instructions: Option<String>) -> Self {
        Self {
            server_info,
            capabilities,
            instructions,
            on_initialized: parking_lot::RwLock::new(Vec::new()),
        }
    }

    pub fn on_initialized(&self, hook: OnInitialized) {
        self.on_initialized.write().push(hook);
    }

    /// Handle the `initialize` request. The caller is responsible for
    /// enforcing that this is the session's first request and that a
    /// session is never initialized twice (§4.3).
    pub fn handle_initialize(
        &self,
        session: &Session,
        params: InitializeParams,
    ) -> ServerResult<InitializeResult> {
        let negotiated = negotiate_version(&params.protocol_version);
        session.set_protocol_version(negotiated.clone());
        Ok(InitializeResult {
            protocol_version: negotiated,
            server_info: self.server_info.clone(),
            capabilities: self.capabilities.clone(),
            instructions: self.instructions.clone(),
        })
    }

    /// Handle `notifications/initialized`.
    pub fn handle_initialized(&self, session: &Session) -> ServerResult<()> {
        session
            .mark_initialized()
            .map_err(|_| ServerError::AlreadyInitialized)?;
        session.activate();
        for hook in self.on_initialized.read().iter() {
            hook(session);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpcore_core::SessionMode;
    use serde_json::json;

    #[test]
    fn negotiates_exact_match() {
        assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
    }

    #[test]
    fn negotiates_highest_supported_not_exceeding_client() {
        assert_eq!(negotiate_version("2025-03-26"), "2025-03-26");
        assert_eq!(negotiate_version("2025-12-31"), "2025-03-26");
    }

    #[test]
    fn falls_back_to_lowest_when_client_is_older_than_everything() {
        assert_eq!(negotiate_version("2000-01-01"), SUPPORTED_PROTOCOL_VERSIONS[0]);
    }

    #[test]
    fn handle_initialized_twice_is_rejected() {
        let manager = LifecycleManager::new(
            ServerInfo { name: "t".into(), version: "0".into() },
            json!({}),
            None,
        );
        let session = Session::new(SessionMode::Stateful);
        manager.handle_initialized(&session).unwrap();
        assert!(matches!(
            manager.handle_initialized(&session),
            Err(ServerError::AlreadyInitialized)
        ));
    }
}
