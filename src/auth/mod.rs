pub mod credentials;
pub mod jwt;
pub mod models;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::credentials::CredentialStore;
use crate::auth::jwt::TokenService;
use crate::auth::models::{ClaimSet, LoginResponse};
use crate::config::AuthServiceConfig;
use crate::error::{AuthError, FieldError};

/// Authentication service interface
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and issue a token
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError>;

    /// Validate the raw `Authorization` header value and return the claims
    fn verify_request(&self, authorization: Option<&str>) -> Result<ClaimSet, AuthError>;
}

/// Login and token verification over a credential store and a token service
pub struct AuthHandler {
    credentials: Arc<CredentialStore>,
    tokens: Arc<TokenService>,
}

impl AuthHandler {
    pub fn new(credentials: Arc<CredentialStore>, tokens: Arc<TokenService>) -> Self {
        Self { credentials, tokens }
    }

    /// Seeded store and a token service keyed by the configured secret
    pub fn from_config(config: &AuthServiceConfig) -> Result<Self, AuthError> {
        let credentials = CredentialStore::with_default_seed(config.bcrypt_cost)?;
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl())?;

        tracing::info!(
            accounts = credentials.len(),
            ttl_secs = config.token_ttl_seconds,
            "Auth handler initialized"
        );

        Ok(Self::new(Arc::new(credentials), Arc::new(tokens)))
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}

#[async_trait]
impl AuthService for AuthHandler {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        validate_login(username, password)?;

        let Some(record) = self.credentials.find_by_username(username) else {
            // keep the miss as slow as a wrong password
            let _ = password_matches(password, self.credentials.dummy_hash()).await;
            tracing::warn!(username, "Login failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !password_matches(password, &record.password_hash).await? {
            tracing::warn!(username, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let user = record.public_user();
        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = user.id, role = %user.role, "Login succeeded");

        Ok(LoginResponse { token, user })
    }

    fn verify_request(&self, authorization: Option<&str>) -> Result<ClaimSet, AuthError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)?;

        self.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AuthError::from(e)
        })
    }
}

/// Extract the token from a `Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn validate_login(username: &str, password: &str) -> Result<(), AuthError> {
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push(FieldError::body("username", "Invalid value"));
    }
    if password.is_empty() {
        errors.push(FieldError::body("password", "Invalid value"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}

/// bcrypt comparison on the blocking pool
async fn password_matches(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();

    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("Password check task failed: {}", e)))?
        .map_err(|e| AuthError::Internal(format!("Password check failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use std::time::Duration;

    fn handler() -> AuthHandler {
        AuthHandler::new(
            Arc::new(CredentialStore::with_default_seed(4).unwrap()),
            Arc::new(TokenService::new("test-secret", Duration::from_secs(3600)).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_login_success() {
        let handler = handler();
        let response = handler.login("admin", "admin123").await.unwrap();

        assert_eq!(response.user.id, 1);
        assert_eq!(response.user.role, Role::Admin);

        let claims = handler.tokens().verify(&response.token).unwrap();
        assert_eq!(claims.username, "admin");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let handler = handler();

        let wrong_password = handler.login("admin", "wrong").await.unwrap_err();
        let unknown_user = handler.login("ghost", "admin123").await.unwrap_err();

        assert_eq!(wrong_password.to_string(), "Invalid credentials");
        assert_eq!(unknown_user.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn test_login_validation() {
        let handler = handler();

        match handler.login("", "").await {
            Err(AuthError::Validation(errors)) => {
                let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
                assert_eq!(paths, vec!["username", "password"]);
            }
            other => panic!("expected validation error, got {:?}", other.map(|r| r.user)),
        }

        assert!(matches!(
            handler.login("admin", "").await,
            Err(AuthError::Validation(errors)) if errors.len() == 1
        ));
    }

    #[tokio::test]
    async fn test_verify_request() {
        let handler = handler();
        let token = handler.login("admin", "admin123").await.unwrap().token;

        let claims = handler
            .verify_request(Some(&format!("Bearer {}", token)))
            .unwrap();
        assert_eq!(claims.id, 1);

        assert!(matches!(handler.verify_request(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            handler.verify_request(Some("Basic xyz")),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            handler.verify_request(Some("Bearer malformedtoken")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Token abc"), None);
    }
}
