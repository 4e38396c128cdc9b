use microgate::config::GatewayConfig;
use microgate::core::gateway::{ApiGateway, Gateway};
use microgate::error::GatewayError;
use microgate::middleware::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env()?;
    init_tracing(&config.logging);

    tracing::info!(
        auth = %config.upstreams.auth_service_url,
        users = %config.upstreams.user_service_url,
        products = %config.upstreams.product_service_url,
        "Starting API Gateway on {}",
        config.server.bind_address()
    );

    let gateway = ApiGateway::new(config)?;
    gateway.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API Gateway");

    gateway.stop().await
}
