use std::sync::Arc;

use microgate::auth::{routes, AuthHandler};
use microgate::config::AuthServiceConfig;
use microgate::core::server::serve_until_ctrl_c;
use microgate::error::GatewayError;
use microgate::middleware::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    dotenvy::dotenv().ok();

    let config = AuthServiceConfig::from_env()?;
    init_tracing(&config.logging);

    let handler = AuthHandler::from_config(&config)
        .map_err(|e| GatewayError::InternalError(format!("Failed to initialize auth: {}", e)))?;

    tracing::info!("Auth service starting on {}", config.server.bind_address());
    serve_until_ctrl_c(routes::app(Arc::new(handler)), &config.server.bind_address()).await
}
