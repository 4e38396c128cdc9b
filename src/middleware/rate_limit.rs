use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hyper::header::HeaderValue;
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::error::GatewayError;
use crate::middleware::{Middleware, MiddlewareHandler};

/// Request counter for one client within the current window
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.started) >= length
    }
}

#[derive(Debug)]
struct Clients {
    windows: HashMap<String, Window>,
    last_sweep: Instant,
}

/// Fixed-window rate limiter keyed by client IP
pub struct RateLimitMiddleware {
    max_requests: u32,
    window: Duration,
    clients: Mutex<Clients>,
}

impl RateLimitMiddleware {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(Clients {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_seconds))
    }

    /// Count a hit for `key`. Returns the remaining allowance, or the seconds until the window resets.
    async fn hit(&self, key: String, now: Instant) -> Result<u32, u64> {
        let mut clients = self.clients.lock().await;
        let window = self.window;

        // stale windows are swept at most once per window length
        if now.saturating_duration_since(clients.last_sweep) >= window {
            clients.windows.retain(|_, w| !w.expired(now, window));
            clients.last_sweep = now;
        }

        let fresh = Window {
            started: now,
            count: 0,
        };
        let entry = clients.windows.entry(key).or_insert(fresh);
        if entry.expired(now, window) {
            *entry = fresh;
        }

        if entry.count >= self.max_requests {
            let reset = window.saturating_sub(now.duration_since(entry.started));
            return Err(reset.as_secs().max(1));
        }

        entry.count += 1;
        Ok(self.max_requests - entry.count)
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn process_request(
        &self,
        request: GatewayRequest,
        next: Arc<dyn MiddlewareHandler>,
    ) -> Result<GatewayResponse, GatewayError> {
        let key = request.client_key();
        let remaining = match self.hit(key.clone(), Instant::now()).await {
            Ok(remaining) => remaining,
            Err(retry_after_secs) => {
                tracing::warn!(client = %key, limit = self.max_requests, "Rate limit exceeded");
                let mut response =
                    GatewayResponse::from(GatewayError::TooManyRequests { retry_after_secs });
                response
                    .headers
                    .insert("x-ratelimit-limit", HeaderValue::from(self.max_requests));
                response
                    .headers
                    .insert("x-ratelimit-remaining", HeaderValue::from(0u32));
                return Ok(response);
            }
        };

        let mut response = super::respond(&next, request).await;
        response
            .headers
            .insert("x-ratelimit-limit", HeaderValue::from(self.max_requests));
        response
            .headers
            .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
        Ok(response)
    }

    fn name(&self) -> &str {
        "rate_limit"
    }
}
