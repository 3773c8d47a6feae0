//! Bearer token middleware for the mutating endpoints.
//!
//! Runs before the handler extracts the body, so a bad token is answered with
//! 403 no matter what the body contains.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::error::GatewayError;
use super::GatewayState;

/// Validates `Authorization: Bearer <hex>` against the current token.
pub async fn require_auth(State(state): State<GatewayState>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| state.tokens.verify(token));

    if authorized {
        next.run(req).await
    } else {
        warn!(path = %req.uri().path(), "rejected request with missing or invalid token");
        GatewayError::Forbidden.into_response()
    }
}
