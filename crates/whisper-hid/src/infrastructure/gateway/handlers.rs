//! Request handlers for the control gateway.
//!
//! Mutating handlers take the raw body as [`Bytes`] and parse it themselves,
//! so a malformed body maps to our own error codes instead of axum's
//! rejection text.  An empty body counts as `{}`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use whisper_hid_core::{ConnectionState, LogEntry};

use super::error::GatewayError;
use super::GatewayState;

/// Upper bound on a single `/backspace` request.
pub const MAX_BACKSPACE_COUNT: u32 = 1000;

// ── Response bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct RestartResponse {
    pub ok: bool,
    pub message: String,
}

/// Body of `GET /status`.  Reconnect fields appear only while reconnecting;
/// `failure_reason` only once reconnection has given up.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub uptime_seconds: u64,
    pub bluetooth: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl StatusResponse {
    fn build(
        state: &ConnectionState,
        uptime_seconds: u64,
        reconnect_max: u32,
        now: std::time::Instant,
    ) -> Self {
        let reconnect_attempt = state.reconnect_attempt();
        Self {
            service: "running",
            uptime_seconds,
            bluetooth: state.label(),
            device: state.host().map(|host| host.name.clone()),
            reconnect_attempt,
            reconnect_max: reconnect_attempt.map(|_| reconnect_max),
            next_retry_seconds: state
                .next_retry_in(now)
                .map(|wait| wait.as_secs_f64().ceil() as u64),
            failure_reason: state.failure_reason().map(str::to_owned),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TypeRequest {
    #[serde(default)]
    pub text: String,
    /// Appended after `text`; absent means nothing is appended.
    #[serde(default)]
    pub append: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BackspaceRequest {
    /// Kept loose so a bad count yields `invalid_count` rather than
    /// `invalid_json`.
    #[serde(default)]
    pub count: Option<Value>,
}

impl BackspaceRequest {
    /// Missing or `null` means one press.  Integers and integer strings up to
    /// [`MAX_BACKSPACE_COUNT`] are accepted.
    pub fn resolve_count(&self) -> Result<u32, GatewayError> {
        let count = match &self.count {
            None | Some(Value::Null) => return Ok(1),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };
        count
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n <= MAX_BACKSPACE_COUNT)
            .ok_or(GatewayError::InvalidCount)
    }
}

fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::InvalidJson(e.to_string()))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// `POST /type`
pub async fn type_text(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<Json<OkResponse>, GatewayError> {
    let request: TypeRequest = parse_body(&body)?;
    if request.text.is_empty() {
        return Err(GatewayError::EmptyText);
    }

    let mut text = request.text;
    text.push_str(&request.append);
    state.dispatcher.enqueue_text(&text)?;
    info!(chars = text.chars().count(), "typing text");
    Ok(Json(OkResponse { ok: true }))
}

/// `POST /backspace`
pub async fn backspace(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<Json<OkResponse>, GatewayError> {
    let request: BackspaceRequest = parse_body(&body)?;
    let count = request.resolve_count()?;
    state.dispatcher.enqueue_backspace(count)?;
    info!(count, "sending backspace");
    Ok(Json(OkResponse { ok: true }))
}

/// `GET /status`
pub async fn status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    let snapshot = state.manager.snapshot();
    Json(StatusResponse::build(
        &snapshot,
        state.start_time.elapsed().as_secs(),
        state.manager.policy().max_attempts(),
        tokio::time::Instant::now().into_std(),
    ))
}

/// `GET /logs`
pub async fn logs(State(state): State<GatewayState>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.logs.snapshot(),
    })
}

/// `POST /restart`
pub async fn restart(
    State(state): State<GatewayState>,
) -> Result<Json<RestartResponse>, GatewayError> {
    let result = state.manager.restart();

    let rotated = state.rotate_token_on_restart;
    if rotated {
        state.tokens.rotate();
        info!("bearer token rotated");
    }

    if let Err(e) = result {
        error!(error = %e, "restart failed");
        return Err(GatewayError::RegistrationFailed);
    }

    let message = if rotated {
        "bluetooth restarted; bearer token rotated"
    } else {
        "bluetooth restarted"
    };
    Ok(Json(RestartResponse {
        ok: true,
        message: message.to_owned(),
    }))
}

/// Fallback: bare `OPTIONS` on any path gets an empty 204, everything else
/// is `not_found`.
pub async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        GatewayError::NotFound.into_response()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
