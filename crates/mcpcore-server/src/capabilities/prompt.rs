//! Prompt registry: descriptors, a rendering handler, and an optional
//! argument-completion handler (§4.7).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mcpcore_core::RequestContext;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub arguments: Vec<PromptArgument>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: crate::content::ContentBlock,
}

#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn render(
        &self,
        ctx: &RequestContext,
        arguments: HashMap<String, String>,
    ) -> ServerResult<Vec<PromptMessage>>;

    /// Default: no completion suggestions for any argument.
    async fn complete(&self, _argument: &str, _value: &str) -> Vec<String> {
        Vec::new()
    }
}

struct PromptEntry {
    descriptor: PromptDescriptor,
    handler: Arc<dyn PromptHandler>,
}

#[derive(Default)]
pub struct PromptRegistry {
    entries: RwLock<Vec<PromptEntry>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: PromptDescriptor, handler: Arc<dyn PromptHandler>) {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.iter_mut().find(|e| e.descriptor.name == descriptor.name) {
            existing.descriptor = descriptor;
            existing.handler = handler;
        } else {
            entries.push(PromptEntry { descriptor, handler });
        }
    }

    pub fn list(&self) -> Vec<PromptDescriptor> {
        self.entries.read().iter().map(|e| e.descriptor.clone()).collect()
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> ServerResult<Vec<PromptMessage>> {
        let handler = {
            let entries = self.entries.read();
            entries
                .iter()
                .find(|e| e.descriptor.name == name)
                .map(|e| e.handler.clone())
                .ok_or_else(|| ServerError::PromptNotFound(name.to_string()))?
        };
        handler.render(ctx, arguments).await
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn PromptHandler>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.descriptor.name == name)
            .map(|e| e.handler.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentBlock;
    use mcpcore_core::{Session, SessionMode, TransportKind};
    use mcpcore_protocol::RequestId;

    fn test_ctx() -> RequestContext {
        let session = Session::new(SessionMode::Stateful);
        RequestContext::new(RequestId::Number(1), TransportKind::Stdio, session, None)
    }

    struct Greeting;

    #[async_trait]
    impl PromptHandler for Greeting {
        async fn render(
            &self,
            _ctx: &RequestContext,
            arguments: HashMap<String, String>,
        ) -> ServerResult<Vec<PromptMessage>> {
            let name = arguments.get("name").cloned().unwrap_or_default();
            Ok(vec![PromptMessage {
                role: "user".to_string(),
                content: ContentBlock::text(format!("Hi {name}")),
            }])
        }
    }

    #[tokio::test]
    async fn get_renders_with_supplied_arguments() {
        let registry = PromptRegistry::new();
        registry.register(
            PromptDescriptor {
                name: "greeting".to_string(),
                description: None,
                arguments: vec![PromptArgument {
                    name: "name".to_string(),
                    description: None,
                    required: true,
                }],
            },
            Arc::new(Greeting),
        );
        let mut args = HashMap::new();
        args.insert("name".to_string(), "Ada".to_string());
        let messages = registry.get(&test_ctx(), "greeting", args).await.unwrap();
        assert_eq!(messages[0].content, ContentBlock::text("Hi Ada"));
    }

    #[tokio::test]
    async fn get_of_unknown_prompt_fails() {
        let registry = PromptRegistry::new();
        let err = registry.get(&test_ctx(), "missing", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::PromptNotFound(_)));
    }
}
