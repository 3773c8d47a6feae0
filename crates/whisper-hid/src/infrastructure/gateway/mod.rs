//! Control gateway: the loopback HTTP API the browser shell talks to.
//!
//! # For beginners
//!
//! The shell is a web page.  It cannot talk Bluetooth, so it sends small JSON
//! requests to this server on `127.0.0.1`.  The server checks the bearer
//! token, turns each request into dispatcher or connection-manager calls, and
//! answers with JSON.
//!
//! | Endpoint          | Auth   | What it does                         |
//! |-------------------|--------|--------------------------------------|
//! | `POST /type`      | bearer | queue text for typing                |
//! | `POST /backspace` | bearer | queue Backspace presses              |
//! | `POST /restart`   | bearer | re-register the keyboard service     |
//! | `GET /status`     | none   | connection state and uptime          |
//! | `GET /logs`       | none   | recent log lines from the ring       |
//!
//! Handlers never block on keystrokes: they enqueue and return.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod token;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use whisper_hid_core::LogRing;

use crate::application::dispatch_keystrokes::KeystrokeDispatcher;
use crate::application::manage_connection::ConnectionManager;

pub use error::GatewayError;
pub use routes::create_router;
pub use token::TokenStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<ConnectionManager>,
    pub dispatcher: Arc<KeystrokeDispatcher>,
    pub tokens: Arc<TokenStore>,
    pub logs: Arc<LogRing>,
    /// Mint a new token on every `/restart`.
    pub rotate_token_on_restart: bool,
    /// Server start time for uptime reporting.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(
        manager: Arc<ConnectionManager>,
        dispatcher: Arc<KeystrokeDispatcher>,
        tokens: Arc<TokenStore>,
        logs: Arc<LogRing>,
    ) -> Self {
        Self {
            manager,
            dispatcher,
            tokens,
            logs,
            rotate_token_on_restart: false,
            start_time: Instant::now(),
        }
    }

    pub fn with_token_rotation(mut self, rotate: bool) -> Self {
        self.rotate_token_on_restart = rotate;
        self
    }
}

/// Binds `addr` and serves `router` until `shutdown` resolves.
///
/// # Errors
///
/// Fails if the address cannot be bound or the accept loop errors.
pub async fn serve(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "control gateway listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
