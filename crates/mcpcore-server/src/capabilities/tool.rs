//! Tool registry: name/description/inputSchema/annotations/handler (§4.5).

use std::sync::Arc;

use async_trait::async_trait;
use mcpcore_core::RequestContext;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::CallToolResult;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(rename = "idempotentHint", skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(rename = "openWorldHint", skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// What `tools/list` hands back for one tool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &RequestContext, arguments: Value) -> ServerResult<CallToolResult>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(RequestContext, Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ServerResult<CallToolResult>> + Send,
{
    async fn call(&self, ctx: &RequestContext, arguments: Value) -> ServerResult<CallToolResult> {
        (self)(ctx.clone(), arguments).await
    }
}

struct ToolEntry {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
    compiled_schema: Option<jsonschema::JSONSchema>,
}

/// `filter(ctx, tools) -> tools`, applied after listing but before the
/// result is handed back to the client — e.g. to hide tools a caller's role
/// doesn't permit.
pub type ListFilter = Arc<dyn Fn(&RequestContext, Vec<ToolDescriptor>) -> Vec<ToolDescriptor> + Send + Sync>;

/// `modify(ctx, name) -> name`, applied to an incoming `tools/call` name
/// before registry lookup — e.g. to resolve an alias to its canonical name.
pub type NameModifier = Arc<dyn Fn(&RequestContext, &str) -> String + Send + Sync>;

/// An insertion-ordered, name-unique registry of tools.
#[derive(Default)]
pub struct ToolRegistry {
    entries: RwLock<Vec<ToolEntry>>,
    filter: RwLock<Option<ListFilter>>,
    name_modifier: RwLock<Option<NameModifier>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_list_filter(&self, filter: ListFilter) {
        *self.filter.write() = Some(filter);
    }

    pub fn set_name_modifier(&self, modifier: NameModifier) {
        *self.name_modifier.write() = Some(modifier);
    }

    /// Register a tool. Re-registering an existing name overwrites the entry
    /// in place without moving its position in list order.
    pub fn register(
        &self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) {
        let compiled_schema = jsonschema::JSONSchema::compile(&descriptor.input_schema).ok();
        let mut entries = self.entries.write();
        if let Some(existing) = entries.iter_mut().find(|e| e.descriptor.name == descriptor.name) {
            existing.descriptor = descriptor;
            existing.handler = handler;
            existing.compiled_schema = compiled_schema;
        } else {
            entries.push(ToolEntry {
                descriptor,
                handler,
                compiled_schema,
            });
        }
    }

    pub fn list(&self, ctx: &RequestContext) -> Vec<ToolDescriptor> {
        let descriptors: Vec<ToolDescriptor> = self
            .entries
            .read()
            .iter()
            .map(|e| e.descriptor.clone())
            .collect();
        match self.filter.read().as_ref() {
            Some(filter) => filter(ctx, descriptors),
            None => descriptors,
        }
    }

    pub async fn call(
        &self,
        ctx: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> ServerResult<CallToolResult> {
        let name = match self.name_modifier.read().as_ref() {
            Some(modifier) => modifier(ctx, name),
            None => name.to_string(),
        };
        let (handler, schema_ok) = {
            let entries = self.entries.read();
            let entry = entries
                .iter()
                .find(|e| e.descriptor.name == name)
                .ok_or_else(|| ServerError::ToolNotFound(name.to_string()))?;
            let schema_ok = match &entry.compiled_schema {
                Some(schema) => schema.is_valid(&arguments),
                None => true,
            };
            (entry.handler.clone(), schema_ok)
        };
        if !schema_ok {
            return Err(ServerError::InvalidParams(format!(
                "arguments for tool '{name}' do not satisfy its input schema"
            )));
        }
        handler.call(ctx, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpcore_core::{Session, SessionMode, TransportKind};
    use mcpcore_protocol::RequestId;
    use serde_json::json;

    fn test_ctx() -> RequestContext {
        let session = Session::new(SessionMode::Stateful);
        RequestContext::new(RequestId::Number(1), TransportKind::Stdio, session, None)
    }

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, _ctx: &RequestContext, args: Value) -> ServerResult<CallToolResult> {
            let name = args["name"].as_str().unwrap_or("there");
            Ok(CallToolResult::text(format!("Hello, {name}!")))
        }
    }

    fn echo_descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".to_string(),
            description: Some("says hello".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }),
            annotations: None,
        }
    }

    #[tokio::test]
    async fn call_invokes_the_registered_handler() {
        let registry = ToolRegistry::new();
        registry.register(echo_descriptor(), Arc::new(Echo));
        let result = registry
            .call(&test_ctx(), "echo", json!({"name": "World"}))
            .await
            .unwrap();
        assert_eq!(result.content[0], crate::content::ContentBlock::text("Hello, World!"));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn call_rewrites_the_name_via_the_name_modifier_before_lookup() {
        let registry = ToolRegistry::new();
        registry.register(echo_descriptor(), Arc::new(Echo));
        registry.set_name_modifier(Arc::new(|_ctx, name| {
            if name == "hi" { "echo".to_string() } else { name.to_string() }
        }));
        let result = registry
            .call(&test_ctx(), "hi", json!({"name": "World"}))
            .await
            .unwrap();
        assert_eq!(result.content[0], crate::content::ContentBlock::text("Hello, World!"));
    }

    #[tokio::test]
    async fn call_of_unknown_tool_is_tool_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.call(&test_ctx(), "missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ServerError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn call_with_invalid_arguments_is_rejected_before_invoking_handler() {
        let registry = ToolRegistry::new();
        registry.register(echo_descriptor(), Arc::new(Echo));
        let err = registry.call(&test_ctx(), "echo", json!({})).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidParams(_)));
    }

    #[test]
    fn list_preserves_insertion_order() {
        let registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor {
                name: "b".into(),
                description: None,
                input_schema: json!({}),
                annotations: None,
            },
            Arc::new(Echo),
        );
        registry.register(
            ToolDescriptor {
                name: "a".into(),
                description: None,
                input_schema: json!({}),
                annotations: None,
            },
            Arc::new(Echo),
        );
        let names: Vec<_> = registry.list(&test_ctx()).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn re_registration_does_not_move_position() {
        let registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor { name: "a".into(), description: None, input_schema: json!({}), annotations: None },
            Arc::new(Echo),
        );
        registry.register(
            ToolDescriptor { name: "b".into(), description: None, input_schema: json!({}), annotations: None },
            Arc::new(Echo),
        );
        registry.register(
            ToolDescriptor { name: "a".into(), description: Some("updated".into()), input_schema: json!({}), annotations: None },
            Arc::new(Echo),
        );
        let names: Vec<_> = registry.list(&test_ctx()).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
