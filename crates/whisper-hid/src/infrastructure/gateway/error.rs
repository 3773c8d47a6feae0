//! Gateway error type and JSON error bodies.
//!
//! Every failure leaves the gateway as `{"ok": false, "error": "<code>"}` with
//! a status code chosen by variant.  The codes are part of the contract with
//! the shell and never carry internal detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::application::dispatch_keystrokes::DispatchError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    /// Machine-readable error code (e.g. `"forbidden"`).
    pub error: &'static str,
}

/// Failure outcomes of a gateway request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Missing or wrong bearer token.
    #[error("forbidden")]
    Forbidden,
    /// `/type` with empty `text`.
    #[error("text must not be empty")]
    EmptyText,
    /// `/backspace` with a `count` that is not a non-negative integer.
    #[error("count must be a non-negative integer")]
    InvalidCount,
    /// The body is not the JSON shape the endpoint expects.
    #[error("malformed JSON body: {0}")]
    InvalidJson(String),
    /// No host is connected.
    #[error("bluetooth disconnected")]
    TransportUnavailable,
    /// The transport refused registration during `/restart`.
    #[error("bluetooth registration failed")]
    RegistrationFailed,
    /// The relay is shutting down.
    #[error("shutting down")]
    ShuttingDown,
    #[error("not found")]
    NotFound,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::EmptyText | GatewayError::InvalidCount | GatewayError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::TransportUnavailable
            | GatewayError::RegistrationFailed
            | GatewayError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Forbidden => "forbidden",
            GatewayError::EmptyText => "empty_text",
            GatewayError::InvalidCount => "invalid_count",
            GatewayError::InvalidJson(_) => "invalid_json",
            GatewayError::TransportUnavailable => "bluetooth_disconnected",
            GatewayError::RegistrationFailed => "registration_failed",
            GatewayError::ShuttingDown => "shutting_down",
            GatewayError::NotFound => "not_found",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            error: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DispatchError> for GatewayError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::TransportUnavailable => GatewayError::TransportUnavailable,
            DispatchError::ShuttingDown => GatewayError::ShuttingDown,
        }
    }
}
