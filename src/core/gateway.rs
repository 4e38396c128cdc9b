use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{BoxBody, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::{HeaderMap, Method, Response, StatusCode, Uri};
use axum::Extension;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::GatewayConfig;
use crate::core::proxy::UpstreamClient;
use crate::core::request::{client_ip_from, GatewayRequest};
use crate::core::response::GatewayResponse;
use crate::core::router::{RouteTable, Router};
use crate::core::server::{spawn_server, with_common_layers, ServerHandle};
use crate::error::GatewayError;
use crate::middleware::{
    cors_layer, LoggingMiddleware, MiddlewareChain, MiddlewareHandler, RateLimitMiddleware,
    SecurityHeadersMiddleware,
};

const HEALTH_PATH: &str = "/health";

/// Core API Gateway trait that defines the main functionality
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Process an incoming request and return a response
    async fn process_request(&self, request: GatewayRequest) -> GatewayResponse;

    /// Start the gateway server
    async fn start(&self) -> Result<SocketAddr, GatewayError>;

    /// Stop the gateway server
    async fn stop(&self) -> Result<(), GatewayError>;

    /// Check if the gateway is healthy
    async fn health_check(&self) -> bool;
}

/// Final pipeline stage: answer `/health`, otherwise match, rewrite, forward
pub struct Dispatcher {
    router: Arc<dyn Router>,
    upstream: UpstreamClient,
}

impl Dispatcher {
    pub fn new(router: Arc<dyn Router>, upstream: UpstreamClient) -> Self {
        Self { router, upstream }
    }

    fn is_health_check(request: &GatewayRequest) -> bool {
        request.uri.path() == HEALTH_PATH
            && (request.method == Method::GET || request.method == Method::HEAD)
    }
}

#[async_trait]
impl MiddlewareHandler for Dispatcher {
    async fn handle(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        if Self::is_health_check(&request) {
            return Ok(GatewayResponse::json(
                StatusCode::OK,
                &json!({ "status": "healthy", "service": "api-gateway" }),
            ));
        }

        let path = request.uri.path().to_string();

        let entry = self.router.match_route(&path).ok_or_else(|| {
            GatewayError::RouteNotFound(format!("{} {}", request.method, path))
        })?;
        let upstream_path = self.router.rewrite(&path, entry);

        tracing::info!(
            request_id = %request.request_id,
            route = %entry.name,
            "Route matched: {} {} -> {}{}",
            request.method,
            path,
            entry.upstream_base_url,
            upstream_path
        );

        self.upstream.forward(request, entry, &upstream_path).await
    }
}

/// Build the request pipeline configured for the gateway
pub fn build_pipeline(config: &GatewayConfig) -> MiddlewareChain {
    let mut chain = MiddlewareChain::new().with(LoggingMiddleware::default());
    if config.security_headers {
        chain.add(SecurityHeadersMiddleware::new());
    }
    if config.rate_limit.enabled {
        chain.add(RateLimitMiddleware::from_config(&config.rate_limit));
    }
    chain
}

/// What the axum fallback needs to turn a raw request into a pipeline call
#[derive(Clone)]
struct ProxyState {
    pipeline: Arc<dyn MiddlewareHandler>,
    trust_proxy: bool,
    max_body_bytes: usize,
}

/// The API gateway: a fixed route table behind a middleware pipeline
pub struct ApiGateway {
    config: GatewayConfig,
    router: Arc<RouteTable>,
    pipeline: Arc<dyn MiddlewareHandler>,
    cors: Option<CorsLayer>,
    server: tokio::sync::Mutex<Option<ServerHandle>>,
}

impl ApiGateway {
    /// Gateway with the standard auth/users/products routes
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let routes = RouteTable::from_config(&config)?;
        Self::with_routes(config, routes)
    }

    /// Gateway with a custom route table
    pub fn with_routes(config: GatewayConfig, routes: RouteTable) -> Result<Self, GatewayError> {
        let cors = if config.cors.enabled {
            Some(cors_layer(&config.cors)?)
        } else {
            None
        };

        let router = Arc::new(routes);
        let dispatcher = Dispatcher::new(router.clone(), UpstreamClient::new()?);
        let chain = build_pipeline(&config);

        tracing::info!(
            routes = router.routes().len(),
            middlewares = ?chain.names(),
            cors = cors.is_some(),
            trust_proxy = config.trust_proxy,
            "Gateway pipeline built"
        );

        Ok(Self {
            config,
            router,
            pipeline: chain.build(Arc::new(dispatcher)),
            cors,
            server: tokio::sync::Mutex::new(None),
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.router
    }

    /// axum application feeding every request through the pipeline
    pub fn app(&self) -> axum::Router {
        let state = ProxyState {
            pipeline: self.pipeline.clone(),
            trust_proxy: self.config.trust_proxy,
            max_body_bytes: self.config.max_body_bytes,
        };

        let mut app = axum::Router::new()
            .fallback(proxy_handler)
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(Extension(state));

        if let Some(cors) = &self.cors {
            app = app.layer(cors.clone());
        }

        with_common_layers(app)
    }
}

async fn proxy_handler(
    Extension(state): Extension<ProxyState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response<BoxBody> {
    let body = match body {
        Ok(bytes) => bytes,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return GatewayResponse::from(GatewayError::PayloadTooLarge(state.max_body_bytes))
                .into_http();
        }
        Err(rejection) => {
            return GatewayResponse::from(GatewayError::InvalidRequest(format!(
                "Failed to read request body: {}",
                rejection.body_text()
            )))
            .into_http();
        }
    };

    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let client_ip = client_ip_from(&headers, peer, state.trust_proxy);
    let request = GatewayRequest::new(method, uri, headers, body, client_ip);

    state
        .pipeline
        .handle(request)
        .await
        .unwrap_or_else(GatewayResponse::from)
        .into_http()
}

#[async_trait]
impl Gateway for ApiGateway {
    async fn process_request(&self, request: GatewayRequest) -> GatewayResponse {
        self.pipeline
            .handle(request)
            .await
            .unwrap_or_else(GatewayResponse::from)
    }

    async fn start(&self) -> Result<SocketAddr, GatewayError> {
        let mut server = self.server.lock().await;
        if server.is_some() {
            return Err(GatewayError::InternalError(
                "Server is already running".to_string(),
            ));
        }

        let handle = spawn_server(self.app(), &self.config.server.bind_address()).await?;
        let addr = handle.local_addr();
        *server = Some(handle);

        tracing::info!(%addr, "API Gateway started");
        Ok(addr)
    }

    async fn stop(&self) -> Result<(), GatewayError> {
        let handle = self.server.lock().await.take().ok_or_else(|| {
            GatewayError::InternalError("Server is not running".to_string())
        })?;

        handle.shutdown().await?;
        tracing::info!("API Gateway stopped");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.router.routes().is_empty()
    }
}
