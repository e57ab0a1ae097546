//! The top-level server value: owns the session store, capability
//! registries, lifecycle manager, dispatch core, and outbound-request table.

use std::sync::Arc;

use mcpcore_core::{Session, SessionMode, SessionStore, TransportKind};
use mcpcore_protocol::{
    methods, JsonRpcBatch, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use serde_json::Value;

use crate::capabilities::completion::{CompletionArgument, CompletionReference};
use crate::capabilities::prompt::{PromptDescriptor, PromptHandler};
use crate::capabilities::resource::{
    ResourceDescriptor, ResourceHandler, ResourceTemplateDescriptor, ResourceTemplateHandler,
};
use crate::capabilities::tool::{ToolDescriptor, ToolHandler};
use crate::capabilities::Capabilities;
use crate::error::ServerResult;
use crate::fanout::NotificationFanout;
use crate::lifecycle::{LifecycleManager, ServerInfo};
use crate::middleware::Middleware;
use crate::outbound::{OutboundRequests, OutboundSender};
use crate::router::{RequestRouter, RouterConfig};

pub struct McpServer {
    pub sessions: Arc<SessionStore>,
    pub capabilities: Capabilities,
    pub lifecycle: Arc<LifecycleManager>,
    pub router: RequestRouter,
    pub outbound: Arc<OutboundRequests>,
}

impl McpServer {
    pub async fn handle(
        &self,
        session: &Arc<Session>,
        transport: TransportKind,
        request: JsonRpcRequest,
    ) -> JsonRpcResponse {
        self.router.route(session, transport, request).await
    }

    pub async fn handle_batch(
        &self,
        session: &Arc<Session>,
        transport: TransportKind,
        batch: JsonRpcBatch<JsonRpcRequest>,
    ) -> JsonRpcBatch<JsonRpcResponse> {
        self.router.route_batch(session, transport, batch).await
    }

    pub fn fanout(&self) -> NotificationFanout<'_> {
        NotificationFanout::new(&self.sessions)
    }

    /// Dispatch an inbound notification. Shared by every transport so each
    /// doesn't have to reimplement `notifications/initialized` and
    /// `notifications/cancelled` handling.
    ///
    /// Unrecognized notification methods are ignored, per JSON-RPC's
    /// one-way semantics: there is nowhere to report an error.
    pub fn handle_notification(&self, session: &Arc<Session>, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            methods::INITIALIZED => {
                let _ = self.lifecycle.handle_initialized(session);
            }
            methods::CANCELLED => {
                if let Some(request_id) = notification
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .and_then(|v| {
                        v.as_i64()
                            .map(RequestId::Number)
                            .or_else(|| v.as_str().map(|s| RequestId::String(s.to_string())))
                    })
                {
                    session.cancel_request(&request_id);
                }
            }
            _ => {}
        }
    }

    /// Fan a `resources/updated` notification out to every session currently
    /// subscribed to `uri` (§4.6). Sessions that have since disconnected are
    /// silently skipped; subscription bookkeeping for them is cleaned up by
    /// session termination, not here.
    pub fn notify_resource_updated(&self, uri: &str) {
        let fanout = self.fanout();
        for session_id in self.capabilities.resources.subscribers(uri) {
            let notification = JsonRpcNotification::new(
                methods::RESOURCES_UPDATED,
                Some(serde_json::json!({ "uri": uri })),
            );
            let _ = fanout.send_notification(&session_id, notification);
        }
    }

    pub async fn call_client(
        &self,
        sender: &dyn OutboundSender,
        session: &Session,
        transport: TransportKind,
        method: &str,
        params: Option<Value>,
    ) -> ServerResult<Value> {
        self.outbound
            .send_request(sender, &session.id, transport, method, params)
            .await
    }
}

pub struct ServerBuilder {
    server_info: ServerInfo,
    capabilities_value: Value,
    instructions: Option<String>,
    session_mode: SessionMode,
    notification_buffer: usize,
    outbound_timeout: std::time::Duration,
    router_config: RouterConfig,
    middleware: Vec<Arc<dyn Middleware>>,
    capabilities: Capabilities,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: ServerInfo { name: name.into(), version: version.into() },
            capabilities_value: serde_json::json!({}),
            instructions: None,
            session_mode: SessionMode::Stateful,
            notification_buffer: mcpcore_core::session::DEFAULT_NOTIFICATION_BUFFER,
            outbound_timeout: crate::outbound::DEFAULT_OUTBOUND_TIMEOUT,
            router_config: RouterConfig::default(),
            middleware: Vec::new(),
            capabilities: Capabilities::default(),
        }
    }

    pub fn stateless(mut self) -> Self {
        self.session_mode = SessionMode::Stateless;
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn notification_buffer(mut self, size: usize) -> Self {
        self.notification_buffer = size;
        self
    }

    pub fn outbound_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.outbound_timeout = timeout;
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn tool(self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Self {
        self.capabilities.tools.register(descriptor, handler);
        self
    }

    pub fn resource(self, descriptor: ResourceDescriptor, handler: Arc<dyn ResourceHandler>) -> Self {
        self.capabilities.resources.register(descriptor, handler);
        self
    }

    pub fn resource_template(
        self,
        descriptor: ResourceTemplateDescriptor,
        handler: Arc<dyn ResourceTemplateHandler>,
    ) -> Self {
        self.capabilities.resources.register_template(descriptor, handler);
        self
    }

    pub fn prompt(self, descriptor: PromptDescriptor, handler: Arc<dyn PromptHandler>) -> Self {
        self.capabilities.prompts.register(descriptor, handler);
        self
    }

    pub fn build(self) -> McpServer {
        let lifecycle = Arc::new(LifecycleManager::new(
            self.server_info,
            self.capabilities_value,
            self.instructions,
        ));
        let capabilities = self.capabilities;
        let mut router = RequestRouter::with_config(
            capabilities.clone(),
            lifecycle.clone(),
            self.router_config,
        );
        for layer in self.middleware {
            router.middleware_mut().push(layer);
        }
        let sessions = Arc::new(SessionStore::new(self.session_mode, self.notification_buffer));
        let outbound = Arc::new(OutboundRequests::new(self.outbound_timeout));

        let resources_for_cleanup = capabilities.resources.clone();
        let outbound_for_cleanup = outbound.clone();
        sessions.on_terminated(Arc::new(move |session_id| {
            resources_for_cleanup.remove_session(session_id);
            outbound_for_cleanup.cancel_all_for_session(session_id);
        }));

        McpServer {
            sessions,
            capabilities,
            lifecycle,
            router,
            outbound,
        }
    }
}

// Re-exported so callers can construct completion references without
// reaching into the `capabilities` module directly.
pub use CompletionArgument as CompletionArg;
pub use CompletionReference as CompletionRef;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ResourceContents;
    use mcpcore_protocol::methods;

    struct StaticResource;

    #[async_trait::async_trait]
    impl ResourceHandler for StaticResource {
        async fn read(&self, _ctx: &mcpcore_core::RequestContext, uri: &str) -> ServerResult<Vec<ResourceContents>> {
            Ok(vec![ResourceContents::text(uri, "text/plain", "hello")])
        }
    }

    fn server_with_resource() -> McpServer {
        ServerBuilder::new("t", "0")
            .resource(
                ResourceDescriptor { uri: "res://x".into(), name: "x".into(), description: None, mime_type: None },
                Arc::new(StaticResource),
            )
            .build()
    }

    #[tokio::test]
    async fn notify_resource_updated_reaches_a_subscribed_session() {
        let server = server_with_resource();
        let session = server.sessions.create();
        session.activate();

        let init = JsonRpcRequest::new(
            methods::INITIALIZE,
            Some(serde_json::json!({
                "protocolVersion": "2025-03-26",
                "clientInfo": {"name": "c", "version": "1"},
                "capabilities": {}
            })),
            RequestId::Number(1),
        );
        server.handle(&session, mcpcore_core::TransportKind::Stdio, init).await;

        let sub = JsonRpcRequest::new(
            methods::RESOURCES_SUBSCRIBE,
            Some(serde_json::json!({ "uri": "res://x" })),
            RequestId::Number(2),
        );
        let resp = server.handle(&session, mcpcore_core::TransportKind::Stdio, sub).await;
        assert!(resp.is_success());

        server.notify_resource_updated("res://x");

        let mut notifications = session.take_notification_receiver().unwrap();
        let notification = notifications.recv().await.unwrap();
        assert_eq!(notification.method, methods::RESOURCES_UPDATED);
        assert_eq!(notification.params.unwrap()["uri"], "res://x");
    }

    #[tokio::test]
    async fn terminating_a_session_drops_its_resource_subscriptions() {
        let server = server_with_resource();
        let session = server.sessions.create();
        session.activate();

        let init = JsonRpcRequest::new(
            methods::INITIALIZE,
            Some(serde_json::json!({
                "protocolVersion": "2025-03-26",
                "clientInfo": {"name": "c", "version": "1"},
                "capabilities": {}
            })),
            RequestId::Number(1),
        );
        server.handle(&session, mcpcore_core::TransportKind::Stdio, init).await;
        let sub = JsonRpcRequest::new(
            methods::RESOURCES_SUBSCRIBE,
            Some(serde_json::json!({ "uri": "res://x" })),
            RequestId::Number(2),
        );
        server.handle(&session, mcpcore_core::TransportKind::Stdio, sub).await;

        assert_eq!(server.capabilities.resources.subscribers("res://x").len(), 1);
        server.sessions.terminate(&session.id);
        assert!(server.capabilities.resources.subscribers("res://x").is_empty());
    }
}
