//! Axum wiring for the token endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::debug;

use crate::error::no_store;
use crate::grant::TokenEndpoint;

pub const TOKEN_PATH: &str = "/oauth/token";

/// Router serving the token endpoint at [`TOKEN_PATH`].
pub fn token_router(endpoint: Arc<TokenEndpoint>) -> Router {
    Router::new()
        .route(TOKEN_PATH, post(token_handler).fallback(method_not_allowed))
        .with_state(endpoint)
}

async fn token_handler(
    State(endpoint): State<Arc<TokenEndpoint>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Content-Type is not inspected.
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match endpoint.handle(authorization, &body).await {
        Ok(tokens) => no_store(Json(tokens).into_response()),
        Err(err) => {
            debug!(error = %err, "token request rejected");
            err.into_response()
        }
    }
}

async fn method_not_allowed() -> Response {
    no_store((StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")]).into_response())
}
