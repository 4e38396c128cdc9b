use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;
use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::error::GatewayError;
use crate::middleware::{Middleware, MiddlewareHandler};
use crate::utils::duration_to_millis;

/// Initialize the tracing system. `RUST_LOG` takes precedence over the configured level.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match config.level.as_str() {
            level @ ("trace" | "debug" | "info" | "warn" | "error") => EnvFilter::new(level),
            _ => EnvFilter::new("info"),
        }
    });

    let result = if config.json_format {
        Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .json(),
            )
            .try_init()
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_timer(ChronoUtc::rfc_3339()))
            .try_init()
    };

    if result.is_ok() {
        tracing::info!(json = config.json_format, "Tracing initialized");
    }
}

/// Logs every request with a span carrying the request id
pub struct LoggingMiddleware {
    /// Requests slower than this are logged at warn level
    slow_threshold_ms: u64,
}

impl LoggingMiddleware {
    pub fn new(slow_threshold_ms: u64) -> Self {
        Self { slow_threshold_ms }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn process_request(
        &self,
        request: GatewayRequest,
        next: Arc<dyn MiddlewareHandler>,
    ) -> Result<GatewayResponse, GatewayError> {
        let span = tracing::info_span!(
            "request",
            request_id = %request.request_id,
            method = %request.method,
            path = %request.uri.path(),
            client_ip = ?request.client_ip,
        );

        async move {
            tracing::debug!(
                headers_count = request.headers.len(),
                body_size = request.body.len(),
                authorization = request.headers.contains_key("authorization"),
                user_agent = ?request.header("user-agent"),
                "Request received"
            );

            let start = Instant::now();
            let response = super::respond(&next, request).await;
            let elapsed_ms = duration_to_millis(start.elapsed());

            if elapsed_ms > self.slow_threshold_ms {
                tracing::warn!(
                    status = response.status.as_u16(),
                    elapsed_ms,
                    threshold_ms = self.slow_threshold_ms,
                    upstream = ?response.upstream,
                    "Slow request"
                );
            } else {
                tracing::info!(
                    status = response.status.as_u16(),
                    elapsed_ms,
                    upstream = ?response.upstream,
                    "Request completed"
                );
            }

            Ok(response.with_processing_time(elapsed_ms))
        }
        .instrument(span)
        .await
    }

    fn name(&self) -> &str {
        "logging"
    }
}
