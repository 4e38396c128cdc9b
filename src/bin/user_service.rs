use std::sync::Arc;

use microgate::config::ServiceConfig;
use microgate::core::server::serve_until_ctrl_c;
use microgate::error::GatewayError;
use microgate::middleware::logging::init_tracing;
use microgate::services::users::{self, seed_users};
use microgate::services::RecordStore;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env(3002)?;
    init_tracing(&config.logging);

    let store = Arc::new(RecordStore::new(seed_users()));

    tracing::info!("User service starting on {}", config.server.bind_address());
    serve_until_ctrl_c(users::app(store), &config.server.bind_address()).await
}
