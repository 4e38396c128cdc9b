use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Gateway error types
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Upstream service unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Upstream request timed out")]
    RequestTimeout,

    #[error("Too many requests, please try again later.")]
    TooManyRequests { retry_after_secs: u64 },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// HTTP status code mapping for gateway errors
impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to clients. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::BackendUnavailable(_) => "Upstream service unavailable".to_string(),
            GatewayError::ConfigError(_)
            | GatewayError::InternalError(_)
            | GatewayError::IoError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// A single failed field check, shaped like the `errors` array the services return
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub location: &'static str,
    pub path: String,
    pub msg: String,
}

impl FieldError {
    pub fn body(path: &str, msg: &str) -> Self {
        Self {
            location: "body",
            path: path.to_string(),
            msg: msg.to_string(),
        }
    }
}

/// Token verification failures. Never rendered to clients directly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Authentication specific errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Authentication service error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(reason) => AuthError::Internal(reason),
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AuthError::Validation(errors) => json!({ "errors": errors }),
            AuthError::InvalidToken => json!({ "valid": false, "message": self.to_string() }),
            AuthError::Internal(reason) => {
                tracing::error!(error = %reason, "Authentication request failed");
                json!({ "message": "Internal server error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors returned by the user and product services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ServiceError::Validation(errors) => json!({ "errors": errors }),
            ServiceError::NotFound(_) => json!({ "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Configuration specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_codes() {
        assert_eq!(
            GatewayError::RouteNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::BackendUnavailable("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(GatewayError::RequestTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            GatewayError::TooManyRequests { retry_after_secs: 1 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GatewayError::PayloadTooLarge(1024).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = GatewayError::InternalError("mutex poisoned at 0xdeadbeef".into());
        assert_eq!(err.public_message(), "Internal server error");

        let err = GatewayError::BackendUnavailable("tcp connect error 127.0.0.1:1".into());
        assert_eq!(err.public_message(), "Upstream service unavailable");
    }

    #[test]
    fn test_token_errors_collapse_to_invalid_token() {
        for err in [TokenError::Malformed, TokenError::SignatureInvalid, TokenError::Expired] {
            assert!(matches!(AuthError::from(err), AuthError::InvalidToken));
        }
        assert!(matches!(
            AuthError::from(TokenError::Signing("boom".into())),
            AuthError::Internal(_)
        ));
    }

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Validation(vec![FieldError::body("username", "Invalid value")]).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
