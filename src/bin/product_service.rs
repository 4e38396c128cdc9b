use std::sync::Arc;

use microgate::config::ServiceConfig;
use microgate::core::server::serve_until_ctrl_c;
use microgate::error::GatewayError;
use microgate::middleware::logging::init_tracing;
use microgate::services::products::{self, seed_products};
use microgate::services::RecordStore;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env(3003)?;
    init_tracing(&config.logging);

    let store = Arc::new(RecordStore::new(seed_products()));

    tracing::info!("Product service starting on {}", config.server.bind_address());
    serve_until_ctrl_c(products::app(store), &config.server.bind_address()).await
}
