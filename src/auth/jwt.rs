use std::time::Duration;

use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use sha2::Sha256;

use crate::auth::models::{ClaimSet, PublicUser};
use crate::error::TokenError;
use crate::utils::now_secs;

/// Issues and verifies HS256 tokens. Stateless: validity depends only on
/// the signature and the expiry claim.
#[derive(Clone)]
pub struct TokenService {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        let key = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|e| TokenError::Signing(format!("Failed to create key: {}", e)))?;
        Ok(Self { key, ttl })
    }

    /// Default time-to-live for issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user` with the configured ttl
    pub fn issue(&self, user: &PublicUser) -> Result<String, TokenError> {
        self.issue_at(user, self.ttl, now_secs())
    }

    pub fn issue_with_ttl(&self, user: &PublicUser, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(user, ttl, now_secs())
    }

    /// Issue a token as of `now` (Unix seconds). Same inputs give the same token.
    pub fn issue_at(&self, user: &PublicUser, ttl: Duration, now: u64) -> Result<String, TokenError> {
        let claims = ClaimSet {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            issued_at: now,
            expires_at: now.saturating_add(ttl.as_secs()),
        };

        claims
            .sign_with_key(&self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<ClaimSet, TokenError> {
        self.verify_at(token, now_secs())
    }

    /// Verify a token as of `now`; expired once `now >= exp`
    pub fn verify_at(&self, token: &str, now: u64) -> Result<ClaimSet, TokenError> {
        let claims: ClaimSet = token.verify_with_key(&self.key).map_err(classify)?;

        if now >= claims.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn classify(err: jwt::Error) -> TokenError {
    match err {
        jwt::Error::InvalidSignature | jwt::Error::AlgorithmMismatch(..) => {
            TokenError::SignatureInvalid
        }
        _ => TokenError::Malformed,
    }
}
