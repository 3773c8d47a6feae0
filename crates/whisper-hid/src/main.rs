//! whisper-hid: Bluetooth HID keystroke relay, entry point.
//!
//! This binary emulates a Bluetooth keyboard and types whatever a co-located
//! speech-to-text shell sends it.  The shell talks to the loopback control
//! gateway; the relay turns each request into HID input reports on the
//! connected host.
//!
//! # Usage
//!
//! ```text
//! whisper-hid [OPTIONS]
//!
//! Options:
//!   --config <PATH>          TOML config file [env: WHISPER_HID_CONFIG]
//!   --port <PORT>            Gateway port, overrides the config file
//!   --log-level <LEVEL>      Log level, overrides the config file
//!   --simulate-host <NAME>   Name of the simulated paired host
//! ```
//!
//! # Token handoff
//!
//! At startup a fresh bearer token is printed to stdout as
//! `WHISPER_HID_TOKEN=<hex>`.  The same line is printed again whenever
//! `/restart` rotates it.  The token never goes to the log.
//!
//! # Architecture overview
//!
//! ```text
//! Browser shell  (JSON over loopback HTTP)
//!       ↕
//! infrastructure/gateway     bearer auth, CORS, handlers
//!       ↓
//! application/dispatch_keystrokes   serial key-down / key-up worker
//!       ↓
//! application/manage_connection     registration, reconnect backoff
//!       ↕
//! HidTransport  (MockTransport in simulated mode)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use whisper_hid::application::dispatch_keystrokes::{KeystrokeDispatcher, ReportLink};
use whisper_hid::application::manage_connection::ConnectionManager;
use whisper_hid::infrastructure::gateway::{self, create_router, GatewayState, TokenStore};
use whisper_hid::infrastructure::logging;
use whisper_hid::infrastructure::storage::config::{load_config, AppConfig};
use whisper_hid::infrastructure::transport::MockTransport;
use whisper_hid_core::{HostDevice, LogRing};

/// Handle given to the simulated host.
const SIMULATED_HOST_HANDLE: &str = "00:00:00:00:00:01";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Bluetooth HID keystroke relay.
///
/// Emulates a keyboard and types text received on the loopback gateway.
#[derive(Debug, Parser)]
#[command(
    name = "whisper-hid",
    about = "Bluetooth HID keyboard relay for speech-to-text output",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    ///
    /// A missing file is not an error; every setting keeps its default.
    #[arg(long, env = "WHISPER_HID_CONFIG")]
    config: Option<PathBuf>,

    /// Gateway port.  Overrides `[gateway] port`.
    #[arg(long, env = "WHISPER_HID_PORT")]
    port: Option<u16>,

    /// Log level used when `RUST_LOG` is unset.  Overrides `[logging] level`.
    #[arg(long, env = "WHISPER_HID_LOG_LEVEL")]
    log_level: Option<String>,

    /// Display name of the simulated paired host.
    #[arg(long, default_value = "Simulated Host", env = "WHISPER_HID_SIMULATE_HOST")]
    simulate_host: String,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration fails validation.
    fn into_app_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from '{}'", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged over the config file.
/// 2. Logging is initialised with the console layer and the `/logs` ring.
/// 3. The bearer token is minted and printed to stdout.
/// 4. Connection Manager, Dispatcher and Gateway are built in that order.
/// 5. The keyboard service is registered.  A refusal is logged and the
///    gateway still starts so `/restart` can retry.
/// 6. The gateway serves until Ctrl+C, then the dispatcher drains and the
///    registration is released.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_app_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    let ring = Arc::new(LogRing::new(config.logging.ring_capacity));
    let _log_guard = logging::init(&config.logging.level, Arc::clone(&ring))
        .context("failed to initialise logging")?;

    info!(
        port = config.gateway.port,
        host = %cli.simulate_host,
        "whisper-hid starting"
    );

    // ── Token ─────────────────────────────────────────────────────────────────
    let tokens = Arc::new(TokenStore::mint());
    println!("WHISPER_HID_TOKEN={}", tokens.current_hex());
    let mut rotations = tokens.subscribe();
    tokio::spawn(async move {
        while rotations.changed().await.is_ok() {
            let token = hex::encode(*rotations.borrow_and_update());
            println!("WHISPER_HID_TOKEN={token}");
        }
    });

    // ── Services ──────────────────────────────────────────────────────────────
    let transport = Arc::new(MockTransport::simulated(HostDevice::new(
        SIMULATED_HOST_HANDLE,
        cli.simulate_host.clone(),
    )));
    let manager = ConnectionManager::new(
        transport,
        config.registration(),
        config.reconnect_policy(),
    );
    let link: Arc<dyn ReportLink> = manager.clone();
    let dispatcher = Arc::new(KeystrokeDispatcher::spawn(link, config.keystroke_delay()));

    let state = GatewayState::new(
        Arc::clone(&manager),
        Arc::clone(&dispatcher),
        Arc::clone(&tokens),
        Arc::clone(&ring),
    )
    .with_token_rotation(config.gateway.rotate_token_on_restart);
    let router = create_router(state, &config.gateway).context("failed to build gateway")?;
    let addr = config.gateway.socket_addr().context("invalid gateway address")?;

    if let Err(e) = manager.start() {
        error!(error = %e, "keyboard registration failed; POST /restart to retry");
    }

    // ── Serve until Ctrl+C ────────────────────────────────────────────────────
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    };
    let served = gateway::serve(router, addr, shutdown).await;

    dispatcher.shutdown().await;
    manager.shutdown();
    served.context("control gateway failed")?;

    info!("whisper-hid stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
