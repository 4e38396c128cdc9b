use hyper::header::HeaderValue;
use hyper::Method;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

use crate::config::CorsConfig;
use crate::error::{ConfigError, GatewayError};

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::PUT,
    Method::PATCH,
    Method::POST,
    Method::DELETE,
];

/// CORS layer for the gateway app. `*` allows any origin.
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, GatewayError> {
    let layer = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(AllowHeaders::mirror_request());

    if config.allow_origin == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origin = config.allow_origin.parse::<HeaderValue>().map_err(|e| {
        GatewayError::ConfigError(ConfigError::Invalid {
            key: "CORS_ALLOW_ORIGIN",
            reason: e.to_string(),
        })
    })?;
    Ok(layer.allow_origin(origin))
}
