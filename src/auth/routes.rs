use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderMap};
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::debug;

use crate::auth::models::{LoginRequest, LoginResponse, VerifyResponse};
use crate::auth::AuthService;
use crate::core::server::{health, with_common_layers};
use crate::error::AuthError;

/// Create the auth service routes
pub fn auth_routes(auth_service: Arc<dyn AuthService>) -> Router {
    Router::new()
        .route("/health", health("auth-service"))
        .route("/login", post(login))
        .route("/verify", post(verify))
        .layer(Extension(auth_service))
}

/// Auth service application with the shared layers
pub fn app(auth_service: Arc<dyn AuthService>) -> Router {
    with_common_layers(auth_routes(auth_service))
}

/// Handle login requests
async fn login(
    Extension(auth_service): Extension<Arc<dyn AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    // unreadable bodies validate like an empty one
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Login body rejected");
            LoginRequest::default()
        }
    };

    let username = request.username.as_deref().unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();

    auth_service.login(username, password).await.map(Json)
}

/// Handle token verification requests
async fn verify(
    Extension(auth_service): Extension<Arc<dyn AuthService>>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, AuthError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let claims = auth_service.verify_request(authorization)?;
    Ok(Json(VerifyResponse {
        valid: true,
        user: claims,
    }))
}
