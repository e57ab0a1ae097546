//! Resource registry: static URIs plus URI-template resources (§4.6).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mcpcore_core::RequestContext;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::content::ResourceContents;
use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceTemplateDescriptor {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, ctx: &RequestContext, uri: &str) -> ServerResult<Vec<ResourceContents>>;
}

#[async_trait]
pub trait ResourceTemplateHandler: Send + Sync {
    async fn read(
        &self,
        ctx: &RequestContext,
        uri: &str,
        variables: HashMap<String, String>,
    ) -> ServerResult<Vec<ResourceContents>>;

    /// Optional completion support for `completion/complete` against a
    /// `ref/resource` reference (§4.7). Default: no suggestions.
    async fn complete(&self, _argument: &str, _value: &str) -> Vec<String> {
        Vec::new()
    }
}

struct StaticEntry {
    descriptor: ResourceDescriptor,
    handler: Arc<dyn ResourceHandler>,
}

struct TemplateEntry {
    descriptor: ResourceTemplateDescriptor,
    matcher: UriTemplate,
    handler: Arc<dyn ResourceTemplateHandler>,
}

/// A minimal RFC 6570 "simple string expansion" URI template matcher:
/// supports `{var}` placeholders, matched segment-at-a-time against a
/// candidate URI.
pub struct UriTemplate {
    pattern: String,
    segments: Vec<TemplateSegment>,
}

enum TemplateSegment {
    Literal(String),
    Variable(String),
}

impl UriTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let mut segments = Vec::new();
        let mut rest = pattern.as_str();
        while let Some(start) = rest.find('{') {
            if start > 0 {
                segments.push(TemplateSegment::Literal(rest[..start].to_string()));
            }
            let end = rest[start..].find('}').map(|i| start + i).unwrap_or(rest.len());
            let var = rest[start + 1..end].to_string();
            segments.push(TemplateSegment::Variable(var));
            rest = &rest[(end + 1).min(rest.len())..];
        }
        if !rest.is_empty() {
            segments.push(TemplateSegment::Literal(rest.to_string()));
        }
        Self { pattern, segments }
    }

    /// Match `uri` against the template, returning extracted variables on success.
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut vars = HashMap::new();
        let mut remaining = uri;
        let mut iter = self.segments.iter().peekable();
        while let Some(segment) = iter.next() {
            match segment {
                TemplateSegment::Literal(lit) => {
                    remaining = remaining.strip_prefix(lit.as_str())?;
                }
                TemplateSegment::Variable(name) => {
                    let next_literal = match iter.peek() {
                        Some(TemplateSegment::Literal(lit)) => Some(lit.as_str()),
                        _ => None,
                    };
                    let value = match next_literal {
                        Some(lit) => {
                            let idx = remaining.find(lit)?;
                            let (value, rest) = remaining.split_at(idx);
                            remaining = rest;
                            value
                        }
                        None => {
                            let value = remaining;
                            remaining = "";
                            value
                        }
                    };
                    if value.is_empty() {
                        return None;
                    }
                    vars.insert(name.clone(), value.to_string());
                }
            }
        }
        if remaining.is_empty() {
            Some(vars)
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct ResourceRegistry {
    static_entries: RwLock<Vec<StaticEntry>>,
    templates: RwLock<Vec<TemplateEntry>>,
    subscriptions: dashmap::DashMap<String, Vec<mcpcore_core::SessionId>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: ResourceDescriptor, handler: Arc<dyn ResourceHandler>) {
        let mut entries = self.static_entries.write();
        if let Some(existing) = entries.iter_mut().find(|e| e.descriptor.uri == descriptor.uri) {
            existing.descriptor = descriptor;
            existing.handler = handler;
        } else {
            entries.push(StaticEntry { descriptor, handler });
        }
    }

    pub fn register_template(
        &self,
        descriptor: ResourceTemplateDescriptor,
        handler: Arc<dyn ResourceTemplateHandler>,
    ) {
        let matcher = UriTemplate::new(descriptor.uri_template.clone());
        self.templates.write().push(TemplateEntry {
            descriptor,
            matcher,
            handler,
        });
    }

    pub fn list(&self) -> Vec<ResourceDescriptor> {
        self.static_entries.read().iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn list_templates(&self) -> Vec<ResourceTemplateDescriptor> {
        self.templates.read().iter().map(|e| e.descriptor.clone()).collect()
    }

    pub async fn read(&self, ctx: &RequestContext, uri: &str) -> ServerResult<Vec<ResourceContents>> {
        let static_handler = {
            let entries = self.static_entries.read();
            entries.iter().find(|e| e.descriptor.uri == uri).map(|e| e.handler.clone())
        };
        if let Some(handler) = static_handler {
            return handler.read(ctx, uri).await;
        }

        match self.match_template(uri) {
            Some((handler, vars)) => handler.read(ctx, uri, vars).await,
            None => Err(ServerError::ResourceNotFound(uri.to_string())),
        }
    }

    /// Match `uri` against every registered template, returning its handler
    /// and the extracted template variables. Used by `completion/complete`
    /// for a `ref/resource` reference, independent of an actual `read`
    /// (§4.7).
    pub fn match_template(
        &self,
        uri: &str,
    ) -> Option<(Arc<dyn ResourceTemplateHandler>, HashMap<String, String>)> {
        let templates = self.templates.read();
        templates
            .iter()
            .find_map(|entry| entry.matcher.matches(uri).map(|vars| (entry.handler.clone(), vars)))
    }

    pub fn subscribe(&self, uri: &str, session_id: mcpcore_core::SessionId) {
        self.subscriptions.entry(uri.to_string()).or_default().push(session_id);
    }

    pub fn unsubscribe(&self, uri: &str, session_id: &mcpcore_core::SessionId) {
        if let Some(mut subs) = self.subscriptions.get_mut(uri) {
            subs.retain(|id| id != session_id);
        }
    }

    pub fn subscribers(&self, uri: &str) -> Vec<mcpcore_core::SessionId> {
        self.subscriptions.get(uri).map(|v| v.clone()).unwrap_or_default()
    }

    /// Drop every subscription belonging to a terminated session.
    pub fn remove_session(&self, session_id: &mcpcore_core::SessionId) {
        for mut entry in self.subscriptions.iter_mut() {
            entry.retain(|id| id != session_id);
        }
    }
}
