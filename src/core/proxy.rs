use std::time::Duration;

use hyper::header::{CONTENT_LENGTH, HOST};
use hyper::HeaderMap;

use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::core::router::RouteEntry;
use crate::error::GatewayError;
use crate::utils::is_hop_by_hop;

/// HTTP client forwarding matched requests to their upstream
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self, GatewayError> {
        // per-request timeouts come from the route entry; upstreams are internal, never proxied
        let client = reqwest::Client::builder()
            .no_proxy()
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Forward `request` to `entry` at `upstream_path` and relay the answer unchanged.
    ///
    /// No retries: a refused connection is a 502 and an expired timeout a 504.
    pub async fn forward(
        &self,
        request: GatewayRequest,
        entry: &RouteEntry,
        upstream_path: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let target_url = match request.uri.query() {
            Some(query) => format!("{}{}?{}", entry.upstream_base_url, upstream_path, query),
            None => format!("{}{}", entry.upstream_base_url, upstream_path),
        };

        tracing::debug!(
            request_id = %request.request_id,
            upstream = %entry.name,
            target = %target_url,
            "Forwarding request"
        );

        let response = self
            .client
            .request(request.method, &target_url)
            .headers(forwardable_headers(&request.headers))
            .body(request.body)
            .timeout(entry.timeout())
            .send()
            .await
            .map_err(|e| upstream_error(e, entry))?;

        let status = response.status();
        let headers = forwardable_headers(response.headers());
        let body = response.bytes().await.map_err(|e| upstream_error(e, entry))?;

        Ok(GatewayResponse::new(status, headers, body).with_upstream(entry.name.clone()))
    }
}

/// Copy of `headers` without `host`, `content-length` and hop-by-hop headers.
/// The client and server recompute framing for the buffered body.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == HOST || name == CONTENT_LENGTH || is_hop_by_hop(name.as_str()) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

fn upstream_error(err: reqwest::Error, entry: &RouteEntry) -> GatewayError {
    if err.is_timeout() {
        tracing::warn!(upstream = %entry.name, timeout_ms = entry.timeout_ms, "Upstream timed out");
        GatewayError::RequestTimeout
    } else {
        tracing::warn!(upstream = %entry.name, error = %err, "Upstream request failed");
        GatewayError::BackendUnavailable(format!("{}: {}", entry.name, err))
    }
}
