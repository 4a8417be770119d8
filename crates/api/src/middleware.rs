use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use datagate_auth::{AuthError, Authenticator};

use crate::app::errors::ApiError;
use crate::context::RequestPrincipal;

#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<Authenticator>,
}

/// Resolve the bearer token into a [`RequestPrincipal`] extension.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let principal = match state.authenticator.authenticate(&token) {
        Ok(principal) => principal,
        Err(e) => return ApiError::from(e).into_response(),
    };

    tracing::debug!(caller = %principal.identifier(), kind = %principal.kind(), "request authenticated");
    req.extensions_mut()
        .insert(RequestPrincipal::new(principal, token));

    next.run(req).await
}

/// One log line per request with its outcome.
pub async fn log_request(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), elapsed_ms, "request failed");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), elapsed_ms, "request handled");
    }
    response
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AuthError::not_authorized("No authorization header found"))?;

    let header = header
        .to_str()
        .map_err(|_| AuthError::not_authorized("Cannot parse token in header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AuthError::not_authorized("Authorization header is not a bearer token"))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::not_authorized("Token not found"));
    }

    Ok(token)
}
