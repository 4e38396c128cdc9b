pub mod cors;
pub mod logging;
pub mod rate_limit;
pub mod security_headers;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::error::GatewayError;

pub use cors::cors_layer;
pub use logging::LoggingMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use security_headers::SecurityHeadersMiddleware;

/// A request-pipeline stage that runs in front of the dispatcher
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process a request, usually by delegating to `next`
    async fn process_request(
        &self,
        request: GatewayRequest,
        next: Arc<dyn MiddlewareHandler>,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Get the name of this middleware
    fn name(&self) -> &str;
}

/// Handler for the next stage in the chain
#[async_trait]
pub trait MiddlewareHandler: Send + Sync {
    async fn handle(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}

/// Ordered list of stages; the first added runs outermost
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Builder-style `add`
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.middlewares.iter().map(|m| m.name().to_string()).collect()
    }

    /// Wrap `final_handler` in every stage
    pub fn build(self, final_handler: Arc<dyn MiddlewareHandler>) -> Arc<dyn MiddlewareHandler> {
        let mut handler = final_handler;

        for middleware in self.middlewares.into_iter().rev() {
            handler = Arc::new(MiddlewareLink {
                middleware,
                next: handler,
            });
        }

        handler
    }
}

/// Link in the middleware chain
struct MiddlewareLink {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn MiddlewareHandler>,
}

#[async_trait]
impl MiddlewareHandler for MiddlewareLink {
    async fn handle(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        self.middleware.process_request(request, self.next.clone()).await
    }
}

/// Run the rest of the chain, rendering any error as its HTTP response
pub(crate) async fn respond(
    next: &Arc<dyn MiddlewareHandler>,
    request: GatewayRequest,
) -> GatewayResponse {
    next.handle(request).await.unwrap_or_else(GatewayResponse::from)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bytes::Bytes;
    use hyper::{HeaderMap, Method, StatusCode, Uri};
    use std::net::IpAddr;

    /// Terminal handler answering 200 `ok`
    pub struct OkHandler;

    #[async_trait]
    impl MiddlewareHandler for OkHandler {
        async fn handle(&self, _request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
            Ok(GatewayResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from("ok")))
        }
    }

    pub fn request(method: Method, path: &str, ip: Option<IpAddr>) -> GatewayRequest {
        GatewayRequest::new(
            method,
            path.parse::<Uri>().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
            ip,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{request, OkHandler};
    use super::*;
    use hyper::header::HeaderValue;
    use hyper::Method;

    struct Tag(&'static str);

    #[async_trait]
    impl Middleware for Tag {
        async fn process_request(
            &self,
            request: GatewayRequest,
            next: Arc<dyn MiddlewareHandler>,
        ) -> Result<GatewayResponse, GatewayError> {
            let mut response = next.handle(request).await?;
            let seen = response
                .headers
                .get("x-order")
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{},{}", v, self.0))
                .unwrap_or_else(|| self.0.to_string());
            response.headers.insert("x-order", HeaderValue::from_str(&seen).unwrap());
            Ok(response)
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn test_chain_runs_first_added_outermost() {
        let chain = MiddlewareChain::new().with(Tag("outer")).with(Tag("inner"));
        assert_eq!(chain.names(), vec!["outer", "inner"]);

        let handler = chain.build(Arc::new(OkHandler));
        let response = handler.handle(request(Method::GET, "/", None)).await.unwrap();

        // inner decorates the response first on the way out
        assert_eq!(response.headers.get("x-order").unwrap(), "inner,outer");
    }

    #[tokio::test]
    async fn test_empty_chain_is_final_handler() {
        let handler = MiddlewareChain::new().build(Arc::new(OkHandler));
        let response = handler.handle(request(Method::GET, "/", None)).await.unwrap();
        assert_eq!(response.body, bytes::Bytes::from("ok"));
    }
}
