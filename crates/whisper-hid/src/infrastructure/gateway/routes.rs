//! Router construction.
//!
//! `/status` and `/logs` are public.  `/type`, `/backspace` and `/restart`
//! sit behind [`require_auth`].  CORS admits only the configured shell origin,
//! and every `OPTIONS` request is answered with an empty 204.

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use super::GatewayState;
use crate::infrastructure::storage::config::{ConfigError, GatewayConfig};

/// Builds the gateway router.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when `allowed_origin` is not a valid
/// header value.
pub fn create_router(state: GatewayState, config: &GatewayConfig) -> Result<Router, ConfigError> {
    let origin = HeaderValue::from_str(&config.allowed_origin).map_err(|_| {
        ConfigError::Invalid(format!(
            "gateway.allowed_origin is not a valid origin: {:?}",
            config.allowed_origin
        ))
    })?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_private_network(true);

    let public = Router::new()
        .route("/status", get(handlers::status))
        .route("/logs", get(handlers::logs));

    let protected = Router::new()
        .route("/type", post(handlers::type_text))
        .route("/backspace", post(handlers::backspace))
        .route("/restart", post(handlers::restart))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Ok(public
        .merge(protected)
        .fallback(handlers::fallback)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(GlobalConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(preflight_no_content))
        .with_state(state))
}

/// The CORS layer answers preflights itself with 200; the shell expects 204.
async fn preflight_no_content(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let mut response = next.run(req).await;
    if is_options && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}
