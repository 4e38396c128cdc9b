// API gateway and backing services library

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod middleware;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use auth::{AuthHandler, AuthService};
pub use config::{AuthServiceConfig, GatewayConfig, ServiceConfig};
pub use core::{
    gateway::{ApiGateway, Gateway},
    request::GatewayRequest,
    response::GatewayResponse,
    router::{RouteEntry, RouteTable, Router},
};
pub use error::{AuthError, ConfigError, GatewayError, ServiceError, TokenError};
pub use middleware::{Middleware, MiddlewareHandler};
