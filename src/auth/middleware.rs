//! Authentication middleware for Axum
//!
//! Extracts the bearer token from requests and attaches an [`AuthContext`].

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{AuthContext, AuthError, JwtValidator};
use crate::api::ApiError;

/// Bearer-token authenticator
pub struct Authenticator {
    jwt_validator: Option<Arc<JwtValidator>>,
}

impl Authenticator {
    pub fn new() -> Self {
        Self {
            jwt_validator: None,
        }
    }

    pub fn with_jwt(mut self, jwt_validator: Arc<JwtValidator>) -> Self {
        self.jwt_validator = Some(jwt_validator);
        self
    }

    /// Authenticate a request from its `Authorization` header
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<AuthContext, AuthError> {
        let header = auth_header.ok_or(AuthError::MissingAuth)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingAuth)?;

        match &self.jwt_validator {
            Some(jwt) => jwt.validate(token.trim()),
            None => Err(AuthError::InvalidJwt("JWT not configured".to_string())),
        }
    }
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

/// Auth context extension for request
#[derive(Clone)]
pub struct AuthContextExt(pub AuthContext);

/// Authentication middleware configuration/state.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub authenticator: Arc<Authenticator>,
    /// If false, requests are treated as admin (dev mode).
    pub require_auth: bool,
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let context = match state.authenticator.authenticate(auth_header) {
        Ok(context) => context,
        Err(e) if state.require_auth => {
            tracing::debug!(error = %e, "Rejected unauthenticated request");
            return ApiError::from(e).into_response();
        }
        Err(_) => AuthContext::development(),
    };

    request.extensions_mut().insert(AuthContextExt(context));
    next.run(request).await
}
