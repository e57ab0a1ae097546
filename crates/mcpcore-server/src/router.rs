//! The dispatch core: method routing table, initialize protection, and
//! middleware composition (§4.3).

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use mcpcore_core::{RequestContext, Session, TransportKind};
use mcpcore_protocol::{
    methods, split_meta, JsonRpcBatch, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::capabilities::completion::{self, CompletionArgument, CompletionReference};
use crate::capabilities::Capabilities;
use crate::content::to_value;
use crate::error::{ServerError, ServerResult};
use crate::lifecycle::{InitializeParams, LifecycleManager};
use crate::middleware::MiddlewareChain;

const INITIALIZE_ID_KEY: &str = "__mcpcore_initialize_request_id";

#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Upper bound on concurrently in-flight requests within one batch.
    pub max_batch_concurrency: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_batch_concurrency: 16,
        }
    }
}

pub struct RequestRouter {
    capabilities: Capabilities,
    lifecycle: Arc<LifecycleManager>,
    middleware: MiddlewareChain,
    config: RouterConfig,
}

impl RequestRouter {
    pub fn new(capabilities: Capabilities, lifecycle: Arc<LifecycleManager>) -> Self {
        Self::with_config(capabilities, lifecycle, RouterConfig::default())
    }

    pub fn with_config(
        capabilities: Capabilities,
        lifecycle: Arc<LifecycleManager>,
        config: RouterConfig,
    ) -> Self {
        Self {
            capabilities,
            lifecycle,
            middleware: MiddlewareChain::new(),
            config,
        }
    }

    pub fn middleware_mut(&mut self) -> &mut MiddlewareChain {
        &mut self.middleware
    }

    /// Route one request to completion, applying the middleware chain if any
    /// is registered (an empty chain is a zero-allocation pass-through).
    #[instrument(skip_all, fields(method = %request.method, request_id = %request.id))]
    pub async fn route(
        &self,
        session: &Arc<Session>,
        transport: TransportKind,
        request: JsonRpcRequest,
    ) -> JsonRpcResponse {
        let id = request.id.clone();
        let (params, meta) = split_meta(request.params.clone());
        let ctx = RequestContext::new(id.clone(), transport, session.clone(), meta);

        let response = if self.middleware.is_empty() {
            self.dispatch(&ctx, request.method.clone(), params).await
        } else {
            let capabilities = self.capabilities.clone();
            let lifecycle = self.lifecycle.clone();
            let core_request = request.clone();
            let core: crate::middleware::Next = Arc::new(move |ctx, req| {
                let capabilities = capabilities.clone();
                let lifecycle = lifecycle.clone();
                let (params, _meta) = split_meta(req.params.clone());
                Box::pin(async move {
                    dispatch_with(&capabilities, &lifecycle, &ctx, req.method.clone(), params).await
                })
            });
            let composed = self.middleware.compose(core);
            composed(ctx.clone(), core_request).await
        };

        ctx.finish();
        response
    }

    async fn dispatch(&self, ctx: &RequestContext, method: String, params: Option<Value>) -> JsonRpcResponse {
        dispatch_with(&self.capabilities, &self.lifecycle, ctx, method, params).await
    }

    /// Route a batch of requests with bounded concurrency; wall-clock is
    /// bounded by the slowest request, not the sum of all of them.
    pub async fn route_batch(
        &self,
        session: &Arc<Session>,
        transport: TransportKind,
        batch: JsonRpcBatch<JsonRpcRequest>,
    ) -> JsonRpcBatch<JsonRpcResponse> {
        let responses = stream::iter(batch.items)
            .map(|request| async move { self.route(session, transport, request).await })
            .buffer_unordered(self.config.max_batch_concurrency)
            .collect::<Vec<_>>()
            .await;
        JsonRpcBatch::new(responses)
    }
}

async fn dispatch_with(
    capabilities: &Capabilities,
    lifecycle: &LifecycleManager,
    ctx: &RequestContext,
    method: String,
    params: Option<Value>,
) -> JsonRpcResponse {
    let id = ctx.request_id.clone();

    if method == methods::INITIALIZE {
        if ctx.session.get_data(INITIALIZE_ID_KEY).is_some() {
            return error_response(id, ServerError::AlreadyInitialized);
        }
        ctx.session.mark_non_cancelable(id.clone());
        ctx.session
            .set_data(INITIALIZE_ID_KEY, json!(id.to_string()));
        let parsed: InitializeParams = match parse_params(params) {
            Ok(p) => p,
            Err(e) => return error_response(id, e),
        };
        return match lifecycle.handle_initialize(&ctx.session, parsed) {
            Ok(result) => JsonRpcResponse::success(id, to_value(&result)),
            Err(e) => error_response(id, e),
        };
    }

    if method == methods::PING {
        return JsonRpcResponse::success(id, json!({}));
    }

    if ctx.session.get_data(INITIALIZE_ID_KEY).is_none() {
        return error_response(id, ServerError::NotInitialized);
    }

    let result = route_initialized_method(capabilities, ctx, &method, params).await;
    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(ServerError::MethodNotFound(m)) => JsonRpcResponse::method_not_found(id, &m),
        Err(e) => error_response(id, e),
    }
}

async fn route_initialized_method(
    capabilities: &Capabilities,
    ctx: &RequestContext,
    method: &str,
    params: Option<Value>,
) -> ServerResult<Value> {
    match method {
        methods::TOOLS_LIST => Ok(json!({ "tools": capabilities.tools.list(ctx) })),
        methods::TOOLS_CALL => {
            #[derive(serde::Deserialize)]
            struct CallParams {
                name: String,
                #[serde(default)]
                arguments: Value,
            }
            let p: CallParams = parse_params(params)?;
            let result = capabilities.tools.call(ctx, &p.name, p.arguments).await?;
            Ok(to_value(&result))
        }
        methods::RESOURCES_LIST => Ok(json!({ "resources": capabilities.resources.list() })),
        methods::RESOURCES_TEMPLATES_LIST => {
            Ok(json!({ "resourceTemplates": capabilities.resources.list_templates() }))
        }
        methods::RESOURCES_READ => {
            #[derive(serde::Deserialize)]
            struct ReadParams {
                uri: String,
            }
            let p: ReadParams = parse_params(params)?;
            let contents = capabilities.resources.read(ctx, &p.uri).await?;
            Ok(json!({ "contents": contents }))
        }
        methods::RESOURCES_SUBSCRIBE => {
            #[derive(serde::Deserialize)]
            struct SubParams {
                uri: String,
            }
            let p: SubParams = parse_params(params)?;
            capabilities.resources.subscribe(&p.uri, ctx.session.id.clone());
            Ok(json!({}))
        }
        methods::RESOURCES_UNSUBSCRIBE => {
            #[derive(serde::Deserialize)]
            struct UnsubParams {
                uri: String,
            }
            let p: UnsubParams = parse_params(params)?;
            capabilities.resources.unsubscribe(&p.uri, &ctx.session.id);
            Ok(json!({}))
        }
        methods::PROMPTS_LIST => Ok(json!({ "prompts": capabilities.prompts.list() })),
        methods::PROMPTS_GET => {
            #[derive(serde::Deserialize)]
            struct GetParams {
                name: String,
                #[serde(default)]
                arguments: HashMap<String, String>,
            }
            let p: GetParams = parse_params(params)?;
            let messages = capabilities.prompts.get(ctx, &p.name, p.arguments).await?;
            Ok(json!({ "messages": messages }))
        }
        methods::COMPLETION_COMPLETE => {
            #[derive(serde::Deserialize)]
            struct CompleteParams {
                #[serde(rename = "ref")]
                reference: CompletionReference,
                argument: CompletionArgument,
            }
            let p: CompleteParams = parse_params(params)?;
            let result = completion::complete(
                &capabilities.prompts,
                &capabilities.resources,
                p.reference,
                p.argument,
            )
            .await?;
            Ok(json!({ "completion": result }))
        }
        other => Err(ServerError::MethodNotFound(other.to_string())),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> ServerResult<T> {
    let params = params.unwrap_or(Value::Null);
    serde_json::from_value(params).map_err(|e| ServerError::InvalidParams(e.to_string()))
}

fn error_response(id: RequestId, error: ServerError) -> JsonRpcResponse {
    if matches!(error, ServerError::Internal(_)) {
        warn!(%error, "internal error handling request");
    }
    JsonRpcResponse::error_response(id, error.to_jsonrpc_error())
}
