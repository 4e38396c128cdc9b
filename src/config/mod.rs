use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils::parse_duration;

const DEFAULT_BCRYPT_COST: u32 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Upstream request timeout in seconds
    pub request_timeout: u64,
}

impl ServerConfig {
    fn with_port(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
            request_timeout: 30,
        }
    }

    /// Socket address string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_port(3000)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Whether to log in JSON format
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Base URLs of the services behind the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub auth_service_url: String,
    pub user_service_url: String,
    pub product_service_url: String,
}

/// Fixed-window rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Window length in seconds
    pub window_seconds: u64,

    /// Requests allowed per client within one window
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_seconds: 15 * 60,
            max_requests: 100,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_origin: "*".to_string(),
        }
    }
}

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub upstreams: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub security_headers: bool,

    /// Attribute requests to the first `x-forwarded-for` hop instead of the socket peer
    pub trust_proxy: bool,

    /// Largest request body the gateway will buffer
    pub max_body_bytes: usize,

    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Build a configuration with default pipeline settings around the given upstreams
    pub fn new(upstreams: UpstreamConfig) -> Self {
        Self {
            server: ServerConfig::default(),
            upstreams,
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            security_headers: true,
            trust_proxy: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            logging: LoggingConfig::default(),
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Settings::new(lookup);

        let upstreams = UpstreamConfig {
            auth_service_url: env.url("AUTH_SERVICE_URL")?,
            user_service_url: env.url("USER_SERVICE_URL")?,
            product_service_url: env.url("PRODUCT_SERVICE_URL")?,
        };

        let mut server = env.server(3000)?;
        server.request_timeout = env.parse("REQUEST_TIMEOUT_SECS", 30)?;
        if server.request_timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let rate_limit = RateLimitConfig {
            enabled: env.flag("RATE_LIMIT_ENABLED", true)?,
            window_seconds: env.parse("RATE_LIMIT_WINDOW_SECS", 15 * 60)?,
            max_requests: env.parse("RATE_LIMIT_MAX", 100)?,
        };
        if rate_limit.enabled && rate_limit.window_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_WINDOW_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let max_body_bytes = env.parse("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?;
        if max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_BODY_BYTES",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            server,
            upstreams,
            rate_limit,
            cors: CorsConfig {
                enabled: env.flag("CORS_ENABLED", true)?,
                allow_origin: env.string("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".to_string()),
            },
            security_headers: env.flag("SECURITY_HEADERS_ENABLED", true)?,
            trust_proxy: env.flag("TRUST_PROXY", false)?,
            max_body_bytes,
            logging: env.logging(),
        })
    }
}

/// Auth service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthServiceConfig {
    pub server: ServerConfig,

    /// HMAC secret for signing tokens
    pub jwt_secret: String,

    /// Token time-to-live in seconds
    pub token_ttl_seconds: u64,

    /// bcrypt cost used when hashing seed passwords
    pub bcrypt_cost: u32,

    pub logging: LoggingConfig,
}

impl AuthServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Settings::new(lookup);

        let jwt_secret = env.required("JWT_SECRET")?;
        let expires_in = env.string("JWT_EXPIRES_IN").unwrap_or_else(|| "1h".to_string());
        let ttl = parse_duration(&expires_in)
            .filter(|ttl| !ttl.is_zero())
            .ok_or_else(|| ConfigError::Invalid {
                key: "JWT_EXPIRES_IN",
                reason: format!("'{}' is not a positive duration", expires_in),
            })?;

        let bcrypt_cost = env.parse("BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: "must be between 4 and 31".to_string(),
            });
        }

        Ok(Self {
            server: env.server(3001)?,
            jwt_secret,
            token_ttl_seconds: ttl.as_secs(),
            bcrypt_cost,
            logging: env.logging(),
        })
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }
}

/// Configuration shared by the user and product services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        Self::from_lookup(default_port, env_lookup)
    }

    pub fn from_lookup<F>(default_port: u16, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Settings::new(lookup);
        Ok(Self {
            server: env.server(default_port)?,
            logging: env.logging(),
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Typed access to a flat key/value source
struct Settings<F> {
    lookup: F,
}

impl<F> Settings<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self { lookup }
    }

    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.string(key).ok_or(ConfigError::Missing(key))
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.string(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.string(key).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(ConfigError::Invalid {
                key,
                reason: format!("'{}' is not a boolean", v),
            }),
        }
    }

    fn url(&self, key: &'static str) -> Result<String, ConfigError> {
        let raw = self.required(key)?;
        let parsed = reqwest::Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        Ok(raw.trim_end_matches('/').to_string())
    }

    fn server(&self, default_port: u16) -> Result<ServerConfig, ConfigError> {
        let mut server = ServerConfig::with_port(default_port);
        if let Some(host) = self.string("HOST") {
            server.host = host;
        }
        server.port = self.parse("PORT", default_port)?;
        Ok(server)
    }

    fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.string("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json_format: self
                .string("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

/// Build a lookup over a fixed map, handy for tests and embedding
pub fn map_lookup(values: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |key| values.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        map_lookup(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    const UPSTREAMS: [(&str, &str); 3] = [
        ("AUTH_SERVICE_URL", "http://auth:3001/"),
        ("USER_SERVICE_URL", "http://users:3002"),
        ("PRODUCT_SERVICE_URL", "http://products:3003"),
    ];

    #[test]
    fn test_gateway_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&UPSTREAMS)).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout, 30);
        assert_eq!(config.upstreams.auth_service_url, "http://auth:3001");
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_seconds, 900);
        assert!(config.cors.enabled);
        assert_eq!(config.cors.allow_origin, "*");
        assert!(config.security_headers);
        assert!(!config.trust_proxy);
        assert_eq!(config.max_body_bytes, 100 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_gateway_requires_upstreams() {
        let err = GatewayConfig::from_lookup(lookup(&UPSTREAMS[..2])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PRODUCT_SERVICE_URL"));
    }

    #[test]
    fn test_gateway_rejects_bad_values() {
        let mut pairs = UPSTREAMS.to_vec();
        pairs.push(("PORT", "not-a-port"));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));

        let mut pairs = UPSTREAMS.to_vec();
        pairs[1] = ("USER_SERVICE_URL", "ftp://users");
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "USER_SERVICE_URL", .. })
        ));

        let mut pairs = UPSTREAMS.to_vec();
        pairs.push(("CORS_ENABLED", "maybe"));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "CORS_ENABLED", .. })
        ));
    }

    #[test]
    fn test_gateway_overrides() {
        let mut pairs = UPSTREAMS.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("RATE_LIMIT_MAX", "5"),
            ("RATE_LIMIT_ENABLED", "false"),
            ("LOG_FORMAT", "JSON"),
            ("TRUST_PROXY", "yes"),
            ("MAX_BODY_BYTES", "4096"),
        ]);
        let config = GatewayConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert!(!config.rate_limit.enabled);
        assert!(config.logging.json_format);
        assert!(config.trust_proxy);
        assert_eq!(config.max_body_bytes, 4096);
    }

    #[test]
    fn test_auth_config() {
        let config = AuthServiceConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_IN", "24h"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.token_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.bcrypt_cost, DEFAULT_BCRYPT_COST);
    }

    #[test]
    fn test_auth_config_requires_secret() {
        let err = AuthServiceConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_auth_config_rejects_bad_ttl() {
        for ttl in ["0", "soon", "5 weeks"] {
            let result = AuthServiceConfig::from_lookup(lookup(&[
                ("JWT_SECRET", "s3cret"),
                ("JWT_EXPIRES_IN", ttl),
            ]));
            assert!(matches!(
                result,
                Err(ConfigError::Invalid { key: "JWT_EXPIRES_IN", .. })
            ));
        }
    }

    #[test]
    fn test_service_config_default_port() {
        let config = ServiceConfig::from_lookup(3003, lookup(&[])).unwrap();
        assert_eq!(config.server.port, 3003);
        assert_eq!(config.server.bind_address(), "0.0.0.0:3003");
    }
}
