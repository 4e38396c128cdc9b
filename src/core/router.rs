use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::{ConfigError, GatewayError};

/// A static rule mapping an external path prefix to an upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Name used in logs and response metadata
    pub name: String,

    /// External path prefix, e.g. `/api/users`
    pub prefix: String,

    /// Base URL of the upstream service
    pub upstream_base_url: String,

    /// Part of the path removed before forwarding
    pub strip_prefix: String,

    /// Upstream request timeout in milliseconds
    pub timeout_ms: u64,
}

impl RouteEntry {
    /// Create a route that strips its own prefix
    pub fn new(name: &str, prefix: &str, upstream_base_url: &str) -> Self {
        let prefix = normalize_prefix(prefix);
        Self {
            name: name.to_string(),
            strip_prefix: prefix.clone(),
            prefix,
            upstream_base_url: upstream_base_url.trim_end_matches('/').to_string(),
            timeout_ms: 30_000,
        }
    }

    /// Strip a different prefix than the one matched on
    pub fn with_strip_prefix(mut self, strip_prefix: &str) -> Self {
        self.strip_prefix = normalize_prefix(strip_prefix);
        self
    }

    /// Set upstream timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether the prefix covers `path`, ending on a segment boundary
    fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Router trait for matching request paths to routes
pub trait Router: Send + Sync {
    /// Find the first matching route for the given path
    fn match_route(&self, path: &str) -> Option<&RouteEntry>;

    /// All routes in priority order
    fn routes(&self) -> &[RouteEntry];

    /// Compute the upstream path for a matched route
    fn rewrite(&self, path: &str, entry: &RouteEntry) -> String {
        rewrite(path, entry)
    }
}

/// Remove the entry's strip prefix from `path`. An empty remainder becomes `/`.
pub fn rewrite(path: &str, entry: &RouteEntry) -> String {
    let remainder = if entry.strip_prefix == "/" {
        path
    } else {
        path.strip_prefix(entry.strip_prefix.as_str()).unwrap_or(path)
    };

    if remainder.is_empty() {
        "/".to_string()
    } else if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        format!("/{}", remainder)
    }
}

/// Immutable, ordered route table. First matching prefix wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Build a table, rejecting duplicate prefixes and unusable upstream URLs
    pub fn new(routes: Vec<RouteEntry>) -> Result<Self, GatewayError> {
        for (i, route) in routes.iter().enumerate() {
            if routes[..i].iter().any(|r| r.prefix == route.prefix) {
                return Err(GatewayError::ConfigError(ConfigError::Invalid {
                    key: "routes",
                    reason: format!("duplicate route prefix '{}'", route.prefix),
                }));
            }
            reqwest::Url::parse(&route.upstream_base_url).map_err(|e| {
                GatewayError::ConfigError(ConfigError::Invalid {
                    key: "routes",
                    reason: format!("route '{}': {}", route.name, e),
                })
            })?;
        }
        Ok(Self { routes })
    }

    /// The three service routes exposed by the gateway
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let timeout = Duration::from_secs(config.server.request_timeout);
        Self::new(vec![
            RouteEntry::new("auth", "/api/auth", &config.upstreams.auth_service_url)
                .with_timeout(timeout),
            RouteEntry::new("users", "/api/users", &config.upstreams.user_service_url)
                .with_timeout(timeout),
            RouteEntry::new("products", "/api/products", &config.upstreams.product_service_url)
                .with_timeout(timeout),
        ])
    }
}

impl Router for RouteTable {
    fn match_route(&self, path: &str) -> Option<&RouteEntry> {
        self.routes.iter().find(|route| route.matches(path))
    }

    fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            RouteEntry::new("auth", "/api/auth", "http://auth:3001"),
            RouteEntry::new("users", "/api/users", "http://users:3002/"),
            RouteEntry::new("products", "/api/products", "http://products:3003"),
        ])
        .unwrap()
    }

    #[test]
    fn test_match_users_route() {
        let table = table();
        let entry = table.match_route("/api/users/5").unwrap();

        assert_eq!(entry.name, "users");
        assert_eq!(entry.upstream_base_url, "http://users:3002");
        assert_eq!(table.rewrite("/api/users/5", entry), "/5");
    }

    #[test]
    fn test_unknown_service_has_no_route() {
        let table = table();
        assert!(table.match_route("/api/unknownservice/x").is_none());
        assert!(table.match_route("/health").is_none());
        assert!(table.match_route("/api").is_none());
    }

    #[test]
    fn test_prefix_must_end_on_segment_boundary() {
        let table = table();
        assert!(table.match_route("/api/usersettings").is_none());
        assert!(table.match_route("/api/users").is_some());
    }

    #[test]
    fn test_rewrite_empty_remainder_is_root() {
        let table = table();
        let entry = table.match_route("/api/auth").unwrap();
        assert_eq!(rewrite("/api/auth", entry), "/");
        assert_eq!(rewrite("/api/auth/", entry), "/");
        assert_eq!(rewrite("/api/auth/login", entry), "/login");
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let table = RouteTable::new(vec![
            RouteEntry::new("admin", "/api/users/admin", "http://admin:4000"),
            RouteEntry::new("users", "/api/users", "http://users:3002"),
        ])
        .unwrap();

        assert_eq!(table.match_route("/api/users/admin/1").unwrap().name, "admin");
        assert_eq!(table.match_route("/api/users/1").unwrap().name, "users");

        let reversed = RouteTable::new(table.routes().iter().rev().cloned().collect()).unwrap();
        assert_eq!(reversed.match_route("/api/users/admin/1").unwrap().name, "users");
    }

    #[test]
    fn test_custom_strip_prefix() {
        let entry = RouteEntry::new("v2", "/api/v2/users", "http://users:3002")
            .with_strip_prefix("/api/v2");
        assert_eq!(rewrite("/api/v2/users/9", &entry), "/users/9");
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let table = RouteTable::new(vec![RouteEntry::new("default", "/", "http://fallback:80")]).unwrap();
        let entry = table.match_route("/anything/here").unwrap();
        assert_eq!(rewrite("/anything/here", entry), "/anything/here");
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let result = RouteTable::new(vec![
            RouteEntry::new("a", "/api/users", "http://a:1"),
            RouteEntry::new("b", "/api/users/", "http://b:2"),
        ]);
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_upstream_rejected() {
        let result = RouteTable::new(vec![RouteEntry::new("a", "/api/a", "not a url")]);
        assert!(matches!(result, Err(GatewayError::ConfigError(_))));
    }
}
