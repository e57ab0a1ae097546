//! The middleware chain wrapping the dispatch table (§4.3, §9).
//!
//! Middleware are pure higher-order functions over the handler signature.
//! Composition order is last-registered-outermost: the most recently added
//! middleware sees the request first and the response last.

use std::sync::Arc;

use futures::future::BoxFuture;
use mcpcore_core::RequestContext;
use mcpcore_protocol::{JsonRpcRequest, JsonRpcResponse};

pub type Next = Arc<dyn Fn(RequestContext, JsonRpcRequest) -> BoxFuture<'static, JsonRpcResponse> + Send + Sync>;

pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, ctx: RequestContext, req: JsonRpcRequest, next: Next) -> BoxFuture<'static, JsonRpcResponse>;
}

impl<F> Middleware for F
where
    F: Fn(RequestContext, JsonRpcRequest, Next) -> BoxFuture<'static, JsonRpcResponse> + Send + Sync + 'static,
{
    fn wrap(&self, ctx: RequestContext, req: JsonRpcRequest, next: Next) -> BoxFuture<'static, JsonRpcResponse> {
        (self)(ctx, req, next)
    }
}

#[derive(Default, Clone)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware layer. The most recently registered layer runs
    /// outermost (sees the request before, and the response after, every
    /// previously registered layer).
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Build the composed handler. `core` is the innermost dispatch step.
    pub fn compose(&self, core: Next) -> Next {
        let mut handler = core;
        for layer in &self.layers {
            let layer = layer.clone();
            let inner = handler.clone();
            handler = Arc::new(move |ctx: RequestContext, req: JsonRpcRequest| {
                layer.wrap(ctx, req, inner.clone())
            });
        }
        handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpcore_core::{Session, SessionMode, TransportKind};
    use mcpcore_protocol::{RequestId, JsonRpcResponse as Resp};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_ctx() -> RequestContext {
        let session = Session::new(SessionMode::Stateful);
        RequestContext::new(RequestId::Number(1), TransportKind::Stdio, session, None)
    }

    #[tokio::test]
    async fn last_registered_layer_runs_outermost() {
        let order = Arc::new(std::sync::Mutex::new(Vec::<&'static str>::new()));

        let mut chain = MiddlewareChain::new();
        let o1 = order.clone();
        chain.push(Arc::new(move |ctx, req, next: Next| -> BoxFuture<'static, JsonRpcResponse> {
            o1.lock().unwrap().push("first-in");
            let o1b = o1.clone();
            Box::pin(async move {
                let resp = next(ctx, req).await;
                o1b.lock().unwrap().push("first-out");
                resp
            })
        }));
        let o2 = order.clone();
        chain.push(Arc::new(move |ctx, req, next: Next| -> BoxFuture<'static, JsonRpcResponse> {
            o2.lock().unwrap().push("second-in");
            let o2b = o2.clone();
            Box::pin(async move {
                let resp = next(ctx, req).await;
                o2b.lock().unwrap().push("second-out");
                resp
            })
        }));

        let core: Next = Arc::new(|_ctx, req| {
            Box::pin(async move { Resp::success(req.id, json!(null)) })
        });
        let composed = chain.compose(core);
        let req = mcpcore_protocol::JsonRpcRequest::new("ping", None, RequestId::Number(1));
        let _ = composed(test_ctx(), req).await;

        let observed = order.lock().unwrap().clone();
        assert_eq!(observed, vec!["second-in", "first-in", "first-out", "second-out"]);
    }
}
